use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::Patient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub cpf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_birth: Option<NaiveDate>,
    #[serde(default)]
    pub has_onboarding: bool,
}

impl Account {
    pub fn to_patient(&self) -> Patient {
        Patient {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            cpf: self.cpf.clone(),
            phone: self.phone.clone(),
            picture: self.picture.clone(),
            date_birth: self.date_birth,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_onboarding: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureUpload {
    pub picture: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureUploadResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
}
