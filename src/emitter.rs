use chrono::NaiveDateTime;

use crate::models::{
    AffinitasSubscription, BankStatement, ClientRecord, SeedData, SubscriptionPayment, VatRecord,
};
use crate::normalize::SqlValue;

const RULE: &str = "-- ============================================================";

/// One `insert into` block. Rows are pre-rendered tuples without the
/// trailing separator.
struct InsertBlock<'a> {
    table: &'a str,
    columns: &'a [&'a str],
    rows: Vec<String>,
}

impl InsertBlock<'_> {
    fn write(&self, out: &mut Vec<String>) {
        if self.rows.is_empty() {
            return;
        }
        out.push(format!("-- {} ({} rows)", self.table, self.rows.len()));
        out.push(format!("insert into {} (", self.table));
        out.push(format!("  {}", self.columns.join(", ")));
        out.push(") values".to_string());
        out.push(format!("{};", self.rows.join(",\n")));
        out.push(String::new());
    }
}

fn tuple(values: Vec<SqlValue>) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("  ({})", items.join(", "))
}

// ---------------------------------------------------------------------------
// Row rendering
// ---------------------------------------------------------------------------

const CLIENT_COLUMNS: &[&str] = &[
    "id",
    "company_name",
    "contact_name",
    "accounting_partner",
    "bank_accounts",
    "bank_notes",
    "corporate_tax_registered",
    "trade_license_date",
    "corporate_tax_expiry",
    "service_cost",
    "start_date",
    "subscription_day",
    "is_active",
    "in_bilancio",
    "notes",
];

fn client_row(c: &ClientRecord) -> String {
    tuple(vec![
        SqlValue::from(&c.id),
        SqlValue::from(c.company_name.as_str()),
        SqlValue::from(c.contact_name.clone()),
        SqlValue::from(c.accounting_partner),
        SqlValue::text_array(c.bank_accounts.iter().copied()),
        SqlValue::from(c.bank_notes.clone()),
        SqlValue::from(c.corporate_tax_registered),
        SqlValue::from(c.trade_license_date),
        SqlValue::from(c.corporate_tax_expiry),
        SqlValue::from(c.service_cost),
        SqlValue::from(c.start_date),
        SqlValue::from(c.subscription_day),
        SqlValue::from(c.is_active),
        SqlValue::from(c.in_bilancio),
        SqlValue::from(c.notes.clone()),
    ])
}

const BANK_STATEMENT_COLUMNS: &[&str] = &["client_id", "year", "month", "received"];

fn bank_statement_row(b: &BankStatement) -> String {
    tuple(vec![
        SqlValue::from(&b.client_id),
        SqlValue::from(i64::from(b.year)),
        SqlValue::from(i64::from(b.month)),
        SqlValue::from(b.received),
    ])
}

const SUBSCRIPTION_COLUMNS: &[&str] = &["client_id", "year", "month", "status", "notes"];

fn subscription_row(p: &SubscriptionPayment) -> String {
    tuple(vec![
        SqlValue::from(&p.client_id),
        SqlValue::from(i64::from(p.year)),
        SqlValue::from(i64::from(p.month)),
        SqlValue::from(p.status),
        SqlValue::from(p.notes.clone()),
    ])
}

const VAT_COLUMNS: &[&str] = &[
    "client_id",
    "accounting_partner",
    "application_date",
    "approval_date",
    "return_deadline_1",
    "return_deadline_2",
    "return_deadline_3",
    "return_deadline_4",
    "payment_to_studio",
    "payment_vat",
];

fn vat_row(v: &VatRecord) -> String {
    let mut values = vec![
        SqlValue::from(&v.client_id),
        SqlValue::from(v.accounting_partner),
        SqlValue::from(v.application_date),
        SqlValue::from(v.approval_date),
    ];
    values.extend(v.return_deadlines.iter().map(|d| SqlValue::from(*d)));
    values.push(SqlValue::from(v.payment_to_studio.clone()));
    values.push(SqlValue::from(v.payment_vat.clone()));
    tuple(values)
}

const AFFINITAS_COLUMNS: &[&str] = &[
    "subscription_ref",
    "company_name",
    "status",
    "start_date",
    "next_payment",
    "orders_count",
    "notes",
    "in_segreteria",
];

fn affinitas_row(a: &AffinitasSubscription) -> String {
    tuple(vec![
        SqlValue::from(a.subscription_ref.as_str()),
        SqlValue::from(a.company_name.clone()),
        SqlValue::from(a.status),
        SqlValue::from(a.start_date),
        SqlValue::from(a.next_payment),
        SqlValue::from(a.orders_count),
        SqlValue::from(a.notes.clone()),
        SqlValue::from(a.in_segreteria),
    ])
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// The complete seed script. Empty tables produce no block at all.
pub fn render(data: &SeedData, generated_at: NaiveDateTime) -> String {
    let mut out = vec![
        RULE.to_string(),
        "-- Back-office seed data".to_string(),
        format!("-- Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        RULE.to_string(),
        String::new(),
        "begin;".to_string(),
        String::new(),
    ];

    let blocks = [
        InsertBlock {
            table: "clients",
            columns: CLIENT_COLUMNS,
            rows: data.clients.iter().map(client_row).collect(),
        },
        InsertBlock {
            table: "bank_statements",
            columns: BANK_STATEMENT_COLUMNS,
            rows: data.bank_statements.iter().map(bank_statement_row).collect(),
        },
        InsertBlock {
            table: "subscription_payments",
            columns: SUBSCRIPTION_COLUMNS,
            rows: data.subscription_payments.iter().map(subscription_row).collect(),
        },
        InsertBlock {
            table: "vat_register",
            columns: VAT_COLUMNS,
            rows: data.vat_records.iter().map(vat_row).collect(),
        },
        InsertBlock {
            table: "affinitas_subscriptions",
            columns: AFFINITAS_COLUMNS,
            rows: data.affinitas_subscriptions.iter().map(affinitas_row).collect(),
        },
    ];
    for block in &blocks {
        block.write(&mut out);
    }

    out.push("commit;".to_string());
    out.push(String::new());
    out.push(RULE.to_string());
    out.push(format!("-- Seed complete. Clients loaded: {}", data.clients.len()));
    out.push(RULE.to_string());
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::NaiveDate;

    use super::*;
    use crate::categorizer::{Partner, SubscriptionStatus};
    use crate::identity::derive_identity;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn client(name: &str) -> ClientRecord {
        ClientRecord {
            id: derive_identity(name),
            company_name: name.to_string(),
            contact_name: None,
            accounting_partner: None,
            bank_accounts: BTreeSet::new(),
            bank_notes: None,
            corporate_tax_registered: false,
            trade_license_date: None,
            corporate_tax_expiry: None,
            subscription_day: None,
            service_cost: None,
            start_date: None,
            notes: None,
            is_active: true,
            in_bilancio: true,
            months_received: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_run_has_no_insert_blocks() {
        let sql = render(&SeedData::default(), generated_at());
        assert!(sql.contains("-- Generated: 2026-01-05 09:30:00"));
        assert!(!sql.contains("insert into"));
        let begin = sql.find("begin;").unwrap();
        let commit = sql.find("commit;").unwrap();
        assert!(begin < commit);
        assert!(commit < sql.find("-- Seed complete. Clients loaded: 0").unwrap());
    }

    #[test]
    fn test_client_row_rendering() {
        let mut c = client("O'Hara Trading - Sean");
        c.contact_name = Some("Sean".to_string());
        c.accounting_partner = Some(Partner::Noi);
        c.bank_accounts = ["wio", "stripe"].into_iter().collect();
        c.bank_notes = Some("Wio transfer".to_string());
        c.trade_license_date = NaiveDate::from_ymd_opt(2026, 3, 15);
        c.service_cost = Some(1500.5);
        c.subscription_day = Some(10);
        let data = SeedData {
            clients: vec![c.clone()],
            ..SeedData::default()
        };
        let sql = render(&data, generated_at());
        let expected = format!(
            "  ('{}', 'O''Hara Trading - Sean', 'Sean', 'noi', ARRAY['stripe', 'wio']::text[], \
             'Wio transfer', false, '2026-03-15', NULL, 1500.5, NULL, 10, true, true, NULL);",
            c.id
        );
        assert!(sql.contains(&expected), "{sql}");
        assert!(sql.contains("-- clients (1 rows)"));
        assert!(!sql.contains("insert into bank_statements"));
    }

    #[test]
    fn test_blocks_in_table_order() {
        let a = client("Acme");
        let data = SeedData {
            clients: vec![a.clone()],
            bank_statements: vec![BankStatement {
                client_id: a.id.clone(),
                year: 2026,
                month: 3,
                received: true,
            }],
            subscription_payments: vec![SubscriptionPayment {
                client_id: a.id.clone(),
                year: 2026,
                month: 1,
                status: SubscriptionStatus::Manual,
                notes: Some("bonifico".to_string()),
            }],
            vat_records: vec![VatRecord {
                client_id: a.id.clone(),
                accounting_partner: Some(Partner::VatConsultant),
                application_date: None,
                approval_date: NaiveDate::from_ymd_opt(2026, 2, 1),
                return_deadlines: [None, None, NaiveDate::from_ymd_opt(2026, 10, 28), None],
                payment_to_studio: None,
                payment_vat: Some("yes".to_string()),
            }],
            affinitas_subscriptions: vec![AffinitasSubscription {
                subscription_ref: "#77".to_string(),
                company_name: Some("Acme".to_string()),
                status: "Active",
                start_date: None,
                next_payment: None,
                orders_count: Some(3),
                notes: None,
                in_segreteria: true,
            }],
            orphan_refs: 0,
        };
        let sql = render(&data, generated_at());
        let positions: Vec<usize> = [
            "insert into clients",
            "insert into bank_statements",
            "insert into subscription_payments",
            "insert into vat_register",
            "insert into affinitas_subscriptions",
            "commit;",
        ]
        .iter()
        .map(|needle| sql.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");

        assert!(sql.contains(&format!("  ('{}', 2026, 3, true);", a.id)));
        assert!(sql.contains(&format!("  ('{}', 2026, 1, 'manual', 'bonifico');", a.id)));
        assert!(sql.contains(&format!(
            "  ('{}', 'vat_consultant', NULL, '2026-02-01', NULL, NULL, '2026-10-28', NULL, NULL, 'yes');",
            a.id
        )));
        assert!(sql.contains("  ('#77', 'Acme', 'Active', NULL, NULL, 3, NULL, true);"));
    }

    #[test]
    fn test_rows_are_comma_separated() {
        let data = SeedData {
            clients: vec![client("A"), client("B")],
            ..SeedData::default()
        };
        let sql = render(&data, generated_at());
        let a = derive_identity("A");
        let b = derive_identity("B");
        assert!(sql.contains(&format!("'{a}', 'A',")));
        assert!(sql.contains(&format!("true, true, NULL),\n  ('{b}', 'B',")));
        assert!(sql.contains("Clients loaded: 2"));
    }
}
