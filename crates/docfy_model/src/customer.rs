//! Customer records kept by the back office.

use crate::error::{ModelError, ModelResult};
use crate::ids::LocalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a customer is currently served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    /// Currently served. Active customers own their `number`.
    #[default]
    Active,
    /// No longer served.
    Inactive,
}

impl CustomerStatus {
    /// Returns the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> ModelResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(CustomerStatus::Active),
            "INACTIVE" => Ok(CustomerStatus::Inactive),
            _ => Err(ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// A contact person attached to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerContact {
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Landline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    /// Mobile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cel: Option<String>,
}

/// A business partner of a customer company.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partner {
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identity document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Individual taxpayer registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    /// Share of the company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation: Option<String>,
}

/// A building manager attached to a condominium customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Syndic {
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tel: Option<String>,
    /// Mandate period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Identity document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Individual taxpayer registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
}

/// A recurring filing the office handles for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryObligation {
    /// Obligation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the office started handling it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_date: Option<DateTime<Utc>>,
}

/// A customer record.
///
/// Only `number` and `status` take part in validation; every other field is
/// stored as given. Registry fields keep their Brazilian abbreviations.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Storage identifier, assigned on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LocalId>,
    /// Office-wide customer number, unique among active customers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alter_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Service status.
    #[serde(default)]
    pub status: CustomerStatus,
    /// Customer kind (company, individual, condominium...).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_service_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_activity_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_comp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    /// Contact persons.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<CustomerContact>,
    /// Company partners.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partners: Vec<Partner>,
    /// Condominium syndics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub syndics: Vec<Syndic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cei: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cae: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nirc: Option<String>,
    /// Main economic activity code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnae: Option<String>,
    /// Secondary economic activity codes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cnae2: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syndicate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syndicate_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipal_regist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_regist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_capital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_cro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_office: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_tax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cssl: Option<String>,
    /// Filings handled for this customer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessory_obligations: Vec<AccessoryObligation>,
}

impl Customer {
    /// Creates an active customer with a number and a name.
    pub fn new(number: u64, name: impl Into<String>) -> Self {
        Self {
            number: Some(number),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: CustomerStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns true when the customer is active.
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    /// Returns true when `other` is a different active customer using the
    /// same number as this one.
    pub fn number_clashes_with(&self, other: &Customer) -> bool {
        other.is_active()
            && self.number.is_some()
            && self.number == other.number
            && (self.id.is_none() || self.id != other.id)
    }

    /// Projects the record to its listing summary.
    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            number: self.number,
            alter_number: self.alter_number.clone(),
            name: self.name.clone(),
            customer_type: self.customer_type.clone(),
            cpf: self.cpf.clone(),
            cnpj: self.cnpj.clone(),
        }
    }
}

/// The listing projection of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    /// Storage identifier.
    pub id: Option<LocalId>,
    /// Customer number.
    pub number: Option<u64>,
    /// Alternative number.
    pub alter_number: Option<String>,
    /// Name.
    pub name: Option<String>,
    /// Customer kind.
    #[serde(rename = "type")]
    pub customer_type: Option<String>,
    /// Individual taxpayer registry.
    pub cpf: Option<String>,
    /// Company taxpayer registry.
    pub cnpj: Option<String>,
}
