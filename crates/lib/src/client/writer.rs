//! Conditional writes of nested configuration.
//!
//! An overwrite stores the whole value with one flattened write. A merge
//! flattens locally and only writes keys the keeper does not hold yet, so
//! values changed by operators survive a service restart.

use tracing::debug;

use super::ClientError;
use crate::{
    Result, Value,
    codec::flatten,
    kv::{KvPair, path},
    transport::KeeperTransport,
};

/// Keys touched by a successful conditional write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Keys written, in write order
    pub written: Vec<String>,
    /// Keys left alone because they already existed
    pub skipped: Vec<String>,
}

/// Writes flattened configuration through a [`KeeperTransport`].
pub struct ConditionalWriter<'a> {
    transport: &'a dyn KeeperTransport,
}

impl<'a> ConditionalWriter<'a> {
    pub fn new(transport: &'a dyn KeeperTransport) -> Self {
        Self { transport }
    }

    /// Write `value` below `base_path`.
    ///
    /// With `overwrite` the keeper flattens and stores the whole value in one
    /// request. Otherwise every leaf key is checked and only missing keys are
    /// written, one request each.
    ///
    /// Every key is validated before the first request.
    ///
    /// # Errors
    /// A merge stops at the first failing check or write with
    /// [`ClientError::PartialWrite`]. Keys written before the failure stay.
    pub async fn write(&self, base_path: &str, value: &Value, overwrite: bool) -> Result<WriteReport> {
        let pairs = flatten(base_path, value);
        for pair in &pairs {
            path::validate_key(&pair.key)?;
        }

        if overwrite {
            debug!(base_path, keys = pairs.len(), "overwriting configuration");
            self.transport.put(base_path, value, true).await?;
            return Ok(WriteReport {
                written: pairs.into_iter().map(|pair| pair.key).collect(),
                skipped: Vec::new(),
            });
        }

        self.write_pairs(pairs, false).await
    }

    /// Write each pair to its own key.
    ///
    /// Without `overwrite` existing keys are skipped. Validation is the
    /// caller's job.
    pub async fn write_pairs(&self, pairs: Vec<KvPair>, overwrite: bool) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        for pair in pairs {
            let step = async {
                if !overwrite && self.key_exists(&pair.key).await? {
                    return Ok(false);
                }
                self.transport
                    .put(&pair.key, &Value::from(pair.value.clone()), false)
                    .await?;
                Ok::<_, crate::Error>(true)
            };

            let outcome = step.await;
            match outcome {
                Ok(true) => {
                    debug!(key = %pair.key, "wrote configuration key");
                    report.written.push(pair.key);
                }
                Ok(false) => {
                    debug!(key = %pair.key, "keeping existing configuration key");
                    report.skipped.push(pair.key);
                }
                Err(e) => {
                    return Err(ClientError::PartialWrite {
                        key: pair.key,
                        written: report.written,
                        source: Box::new(e),
                    }
                    .into());
                }
            }
        }
        Ok(report)
    }

    async fn key_exists(&self, key: &str) -> Result<bool> {
        match self.transport.keys(key).await {
            Ok(keys) => Ok(!keys.is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
