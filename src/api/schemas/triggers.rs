use crate::domain::change::{AvailabilityChange, RefTemplate};
use serde::Deserialize;
use serde_json::Value;

/// A database write delivered by the trigger dispatcher.
#[derive(Debug, Deserialize)]
pub struct DatabaseWriteEvent {
    /// Concrete path that was written, e.g. `/users/u1/available`.
    #[serde(rename = "ref")]
    pub ref_path: String,
    #[serde(default)]
    pub before: Value,
    #[serde(default)]
    pub after: Value,
}

impl DatabaseWriteEvent {
    /// Resolves the written ref against the trigger template and extracts the uid.
    ///
    /// # Errors
    /// Returns an error if the ref does not match the template.
    pub fn into_change(self, template: &RefTemplate) -> Result<AvailabilityChange, String> {
        let mut params = template
            .captures(&self.ref_path)
            .ok_or_else(|| format!("Ref {} does not match trigger {template}", self.ref_path))?;

        let uid = params.remove("uid").ok_or_else(|| format!("Trigger {template} does not capture a uid"))?;
        Ok(AvailabilityChange::new(uid, self.before, self.after))
    }
}
