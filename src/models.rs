use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

use crate::categorizer::{Partner, SubscriptionStatus};
use crate::normalize::SqlValue;

/// Synthetic client key, laid out like a UUID (`8-4-4-4-12` lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub(crate) String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ClientId> for SqlValue {
    fn from(id: &ClientId) -> Self {
        SqlValue::from(id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub id: ClientId,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub accounting_partner: Option<Partner>,
    pub bank_accounts: BTreeSet<&'static str>,
    pub bank_notes: Option<String>,
    pub corporate_tax_registered: bool,
    pub trade_license_date: Option<NaiveDate>,
    pub corporate_tax_expiry: Option<NaiveDate>,
    pub subscription_day: Option<i64>,
    pub service_cost: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub in_bilancio: bool,
    /// Month number (1-12) -> statement received.
    pub months_received: BTreeMap<u32, bool>,
}

/// Start date, fee and payment notes for one client, from the payments sheet.
#[derive(Debug, Clone, Default)]
pub struct PaymentTerms {
    pub start_date: Option<NaiveDate>,
    pub service_cost: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BankStatement {
    pub client_id: ClientId,
    pub year: i32,
    pub month: u32,
    pub received: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPayment {
    pub client_id: ClientId,
    pub year: i32,
    pub month: u32,
    pub status: SubscriptionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VatRecord {
    pub client_id: ClientId,
    pub accounting_partner: Option<Partner>,
    pub application_date: Option<NaiveDate>,
    pub approval_date: Option<NaiveDate>,
    pub return_deadlines: [Option<NaiveDate>; 4],
    pub payment_to_studio: Option<String>,
    pub payment_vat: Option<String>,
}

/// A row of the external subscription-service export. Not linked to a client.
#[derive(Debug, Clone)]
pub struct AffinitasSubscription {
    pub subscription_ref: String,
    pub company_name: Option<String>,
    pub status: &'static str,
    pub start_date: Option<NaiveDate>,
    pub next_payment: Option<NaiveDate>,
    pub orders_count: Option<i64>,
    pub notes: Option<String>,
    pub in_segreteria: bool,
}

/// Everything one run produces, in emission order.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub clients: Vec<ClientRecord>,
    pub bank_statements: Vec<BankStatement>,
    pub subscription_payments: Vec<SubscriptionPayment>,
    pub vat_records: Vec<VatRecord>,
    pub affinitas_subscriptions: Vec<AffinitasSubscription>,
    /// Sheet rows whose client could not be matched to a primary record.
    pub orphan_refs: usize,
}
