use std::collections::BTreeSet;

use calamine::Data;

use crate::normalize::{display_text, SqlValue};

/// Account and payment providers recognised in free-text bank notes.
const BANK_ACCOUNTS: &[&str] = &[
    "wio", "stripe", "paypal", "mashreq", "payoneer", "hubpay", "credium", "currenxie", "ziina",
    "mamo", "gateway", "whoop",
];

fn folded(cell: &Data) -> Option<String> {
    display_text(cell).map(|s| s.to_lowercase())
}

// ---------------------------------------------------------------------------
// Accounting partner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partner {
    Noi,
    VatConsultant,
    Affinitas,
    InSospeso,
    Altro,
}

impl Partner {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Noi => "noi",
            Self::VatConsultant => "vat_consultant",
            Self::Affinitas => "affinitas",
            Self::InSospeso => "in_sospeso",
            Self::Altro => "altro",
        }
    }

    /// Blank cells have no partner; anything unrecognised is `altro`.
    pub fn classify(cell: &Data) -> Option<Partner> {
        let s = folded(cell)?;
        if s.contains("noi") {
            Some(Self::Noi)
        } else if s.contains("vat") {
            Some(Self::VatConsultant)
        } else if s.contains("affinitas") {
            Some(Self::Affinitas)
        } else if s.contains("sospeso") || s.contains("sospend") {
            Some(Self::InSospeso)
        } else if matches!(s.as_str(), "" | "nan" | "-") {
            None
        } else {
            Some(Self::Altro)
        }
    }
}

impl From<Option<Partner>> for SqlValue {
    fn from(v: Option<Partner>) -> Self {
        v.map_or(SqlValue::Null, |p| SqlValue::from(p.key()))
    }
}

// ---------------------------------------------------------------------------
// Subscription payment status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Ok,
    Failed,
    NoTentativo,
    Manual,
    Annual,
    #[default]
    Pending,
}

impl SubscriptionStatus {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::NoTentativo => "no_tentativo",
            Self::Manual => "manual",
            Self::Annual => "annual",
            Self::Pending => "pending",
        }
    }

    pub fn classify(cell: &Data) -> SubscriptionStatus {
        let Some(s) = folded(cell) else {
            return Self::Pending;
        };
        if s == "ok" {
            Self::Ok
        } else if s.contains("fail") {
            Self::Failed
        } else if s.contains("tentativo") || s.contains("no tent") {
            Self::NoTentativo
        } else if s.contains("manuale") || s.contains("fattura") {
            Self::Manual
        } else if s.contains("annual") || s.contains("annuale") {
            Self::Annual
        } else {
            Self::Pending
        }
    }
}

impl From<SubscriptionStatus> for SqlValue {
    fn from(v: SubscriptionStatus) -> Self {
        SqlValue::from(v.key())
    }
}

// ---------------------------------------------------------------------------
// Bank accounts
// ---------------------------------------------------------------------------

pub fn extract_bank_accounts(notes: Option<&str>) -> BTreeSet<&'static str> {
    let Some(notes) = notes else {
        return BTreeSet::new();
    };
    let folded = notes.to_lowercase();
    BANK_ACCOUNTS
        .iter()
        .copied()
        .filter(|name| folded.contains(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    #[test]
    fn test_partner_keywords() {
        assert_eq!(Partner::classify(&s("Noi")), Some(Partner::Noi));
        assert_eq!(Partner::classify(&s("VAT consultant")), Some(Partner::VatConsultant));
        assert_eq!(Partner::classify(&s("AFFINITAS")), Some(Partner::Affinitas));
        assert_eq!(Partner::classify(&s("in sospeso")), Some(Partner::InSospeso));
        assert_eq!(Partner::classify(&s("sospendere")), Some(Partner::InSospeso));
        assert_eq!(Partner::classify(&s("Studio Rossi")), Some(Partner::Altro));
    }

    #[test]
    fn test_partner_first_keyword_wins() {
        assert_eq!(Partner::classify(&s("vat noi")), Some(Partner::Noi));
        assert_eq!(Partner::classify(&s("affinitas vat")), Some(Partner::VatConsultant));
    }

    #[test]
    fn test_partner_blank_is_null() {
        assert_eq!(Partner::classify(&Data::Empty), None);
        assert_eq!(Partner::classify(&s("  ")), None);
        assert_eq!(Partner::classify(&s("-")), None);
        assert_eq!(SqlValue::from(Partner::classify(&s("nan"))).to_string(), "NULL");
        assert_eq!(SqlValue::from(Some(Partner::VatConsultant)).to_string(), "'vat_consultant'");
    }

    #[test]
    fn test_subscription_status() {
        assert_eq!(SubscriptionStatus::classify(&s(" OK ")), SubscriptionStatus::Ok);
        assert_eq!(SubscriptionStatus::classify(&s("Payment failed")), SubscriptionStatus::Failed);
        assert_eq!(SubscriptionStatus::classify(&s("no tentativo")), SubscriptionStatus::NoTentativo);
        assert_eq!(SubscriptionStatus::classify(&s("Fattura manuale")), SubscriptionStatus::Manual);
        assert_eq!(SubscriptionStatus::classify(&s("Annuale")), SubscriptionStatus::Annual);
    }

    #[test]
    fn test_subscription_status_defaults_to_pending() {
        assert_eq!(SubscriptionStatus::classify(&Data::Empty), SubscriptionStatus::Pending);
        assert_eq!(SubscriptionStatus::classify(&s("ok?")), SubscriptionStatus::Pending);
        assert_eq!(SubscriptionStatus::classify(&s("boh")), SubscriptionStatus::Pending);
        assert_eq!(SqlValue::from(SubscriptionStatus::Pending).to_string(), "'pending'");
    }

    #[test]
    fn test_extract_bank_accounts() {
        let found = extract_bank_accounts(Some("Wio transfer, Stripe payouts + WIO savings"));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["stripe", "wio"]);
        assert!(extract_bank_accounts(Some("cash only")).is_empty());
        assert!(extract_bank_accounts(None).is_empty());
    }
}
