use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};

/// Note stored when the customer leaves the message field blank
pub const DEFAULT_NOTE: &str = "N/A";

const INCOMPLETE_DETAILS: &str = "Please fill in all the required fields (Name, Address, Contact).";

/// Delivery details collected in the address step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(rename = "customerName", default)]
    pub name: String,
    #[serde(rename = "deliveryAddress", default)]
    pub address: String,
    #[serde(rename = "contactNumber", default)]
    pub contact: String,
    #[serde(rename = "message", default)]
    pub note: String,
}

impl CustomerDetails {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        contact: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            contact: contact.into(),
            note: note.into(),
        }
    }

    /// Trims every field, checks the required ones and fills in the default note.
    pub fn into_complete(self) -> Result<Self, ServiceError> {
        let name = self.name.trim().to_string();
        let address = self.address.trim().to_string();
        let contact = self.contact.trim().to_string();

        if name.is_empty() || address.is_empty() || contact.is_empty() {
            return Err(ServiceError::ValidationError(INCOMPLETE_DETAILS.to_string()));
        }

        let note = match self.note.trim() {
            "" => DEFAULT_NOTE.to_string(),
            note => note.to_string(),
        };

        Ok(Self {
            name,
            address,
            contact,
            note,
        })
    }
}
