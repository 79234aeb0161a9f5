use std::collections::HashMap;
use std::hash::Hash;
use std::sync::OnceLock;

use calamine::Data;
use regex::Regex;

use crate::categorizer::{extract_bank_accounts, Partner, SubscriptionStatus};
use crate::error::Result;
use crate::identity::{derive_identity, IdentityResolver, NameIndex};
use crate::models::{
    AffinitasSubscription, BankStatement, ClientId, ClientRecord, PaymentTerms, SeedData,
    SubscriptionPayment, VatRecord,
};
use crate::normalize::{self, display_text, extract_contact_name, is_blank, DateOrder};
use crate::settings::Settings;
use crate::workbook::{ColumnMap, Sheet, Workbook};

// ---------------------------------------------------------------------------
// Sheet layouts
// ---------------------------------------------------------------------------

const MONTHS: [&str; 12] = [
    "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
];

const CLIENT_COLUMNS: &[&str] = &[
    "company", "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
    "notes", "partner", "corporate_tax", "license", "ct_expiry", "indubai",
];
const CLIENT_FIRST_ROW: usize = 2;

const SUBSCRIPTION_COLUMNS: &[&str] = &[
    "company", "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
    "notes", "day",
];
const SUBSCRIPTION_FIRST_ROW: usize = 2;

// Header spans rows 2-3; data starts after the blank spacer row.
const VAT_COLUMNS: &[&str] = &[
    "company",
    "partner",
    "application",
    "approval",
    "deadline_1",
    "deadline_2",
    "deadline_3",
    "deadline_4",
    "payment_studio",
    "payment_vat",
];
const VAT_FIRST_ROW: usize = 5;
const VAT_DEADLINES: [&str; 4] = ["deadline_1", "deadline_2", "deadline_3", "deadline_4"];

const PAYMENT_HEADERS: &[(&str, &str)] = &[
    ("company", "CLIENTE"),
    ("start_date", "DATA AVVIO"),
    ("service_cost", "COSTO SERVIZIO"),
    ("notes", "NOTE PAGAMENTI"),
];

const AFFINITAS_HEADERS: &[(&str, &str)] = &[
    ("subscription", "SubscriptionSort ascending."),
    ("start_date", "Start DateSort ascending."),
    ("next_payment", "Next PaymentSort ascending."),
    ("orders", "Orders"),
    ("notes", "Note"),
];

/// Company cells that are really header or filler text.
const CLIENT_SKIP: &[&str] = &["nan", "cliente"];
const OTHER_SKIP: &[&str] = &["nan"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn company_name(cell: &Data, skip: &[&str]) -> Option<String> {
    let name = display_text(cell)?;
    if name.is_empty() || skip.contains(&name.to_lowercase().as_str()) {
        return None;
    }
    Some(name)
}

/// Statement-received cells hold a checkbox (or its text); anything else is no observation.
fn month_flag(cell: &Data) -> Option<bool> {
    if let Data::Bool(b) = cell {
        return Some(*b);
    }
    match display_text(cell)?.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn split_subscription_ref(raw: &str) -> (String, Option<String>) {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"^(#\d+)\s+for\s+(.*)").expect("valid subscription pattern"));
    match re.captures(raw) {
        Some(caps) => {
            let company = caps[2].trim().to_string();
            (caps[1].to_string(), Some(company).filter(|c| !c.is_empty()))
        }
        None => (raw.to_string(), None),
    }
}

/// One row per key, in first-seen order; a later row replaces the earlier one.
struct KeyedRows<K, T> {
    rows: Vec<T>,
    positions: HashMap<K, usize>,
}

impl<K: Eq + Hash, T> KeyedRows<K, T> {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Returns true when an earlier row was replaced.
    fn upsert(&mut self, key: K, row: T) -> bool {
        if let Some(&i) = self.positions.get(&key) {
            self.rows[i] = row;
            return true;
        }
        self.positions.insert(key, self.rows.len());
        self.rows.push(row);
        false
    }

    fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

/// Resolves client mentions and counts the ones that had to be synthesized.
struct Links<'a> {
    resolver: &'a IdentityResolver,
    orphans: usize,
}

impl<'a> Links<'a> {
    fn new(resolver: &'a IdentityResolver) -> Self {
        Self {
            resolver,
            orphans: 0,
        }
    }

    fn link(&mut self, name: &str) -> ClientId {
        let resolution = self.resolver.resolve(name);
        if resolution.is_orphan() {
            self.orphans += 1;
        }
        resolution.into_id()
    }
}

// ---------------------------------------------------------------------------
// Per-sheet importers
// ---------------------------------------------------------------------------

fn import_clients(sheet: &Sheet, order: DateOrder) -> Result<Vec<ClientRecord>> {
    let map = ColumnMap::positional(sheet, CLIENT_COLUMNS)?;
    let mut clients = KeyedRows::new();

    for row in sheet.rows_from(CLIENT_FIRST_ROW) {
        let Some(company) = company_name(map.get(row, "company"), CLIENT_SKIP) else {
            continue;
        };
        let id = derive_identity(&company);
        let bank_notes = normalize::text(map.get(row, "notes"));
        let months_received = MONTHS
            .iter()
            .zip(1u32..)
            .filter_map(|(col, month)| month_flag(map.get(row, col)).map(|flag| (month, flag)))
            .collect();
        let corporate_tax_registered = display_text(map.get(row, "corporate_tax"))
            .is_some_and(|s| s.to_lowercase() == "si");

        let record = ClientRecord {
            id: id.clone(),
            contact_name: extract_contact_name(&company),
            accounting_partner: Partner::classify(map.get(row, "partner")),
            bank_accounts: extract_bank_accounts(bank_notes.as_deref()),
            bank_notes,
            corporate_tax_registered,
            trade_license_date: normalize::date(map.get(row, "license"), order),
            corporate_tax_expiry: normalize::date(map.get(row, "ct_expiry"), order),
            subscription_day: None,
            service_cost: None,
            start_date: None,
            notes: None,
            is_active: true,
            in_bilancio: true,
            months_received,
            company_name: company,
        };
        if clients.upsert(id, record) {
            log::warn!(
                "Sheet '{}': client listed twice, keeping the later row",
                sheet.name
            );
        }
    }
    Ok(clients.into_rows())
}

fn import_payments(
    sheet: &Sheet,
    links: &mut Links,
    order: DateOrder,
) -> Result<HashMap<ClientId, PaymentTerms>> {
    let map = ColumnMap::from_header(sheet, 0, PAYMENT_HEADERS)?;
    let mut terms = HashMap::new();

    for row in sheet.rows_from(1) {
        let Some(company) = company_name(map.get(row, "company"), OTHER_SKIP) else {
            continue;
        };
        let id = links.link(&company);
        terms.insert(
            id,
            PaymentTerms {
                start_date: normalize::date(map.get(row, "start_date"), order),
                service_cost: normalize::number(map.get(row, "service_cost")),
                notes: normalize::text(map.get(row, "notes")),
            },
        );
    }
    Ok(terms)
}

struct SubscriptionImport {
    payments: Vec<SubscriptionPayment>,
    days: HashMap<ClientId, i64>,
}

fn import_subscriptions(sheet: &Sheet, links: &mut Links, year: i32) -> Result<SubscriptionImport> {
    let map = ColumnMap::positional(sheet, SUBSCRIPTION_COLUMNS)?;
    let mut payments = KeyedRows::new();
    let mut days = HashMap::new();

    for row in sheet.rows_from(SUBSCRIPTION_FIRST_ROW) {
        let Some(company) = company_name(map.get(row, "company"), CLIENT_SKIP) else {
            continue;
        };
        let id = links.link(&company);
        if let Some(day) = normalize::integer(map.get(row, "day")) {
            days.insert(id.clone(), day);
        }

        for (col, month) in MONTHS.iter().zip(1u32..) {
            let cell = map.get(row, col);
            if is_blank(cell) {
                continue;
            }
            // The notes column describes the whole row; it rides on January.
            let notes = if month == 1 {
                normalize::text(map.get(row, "notes"))
            } else {
                None
            };
            let payment = SubscriptionPayment {
                client_id: id.clone(),
                year,
                month,
                status: SubscriptionStatus::classify(cell),
                notes,
            };
            if payments.upsert((id.clone(), month), payment) {
                log::warn!(
                    "Sheet '{}': '{}' resolves to a client already seen, month {} replaced",
                    sheet.name,
                    company,
                    month
                );
            }
        }
    }
    Ok(SubscriptionImport {
        payments: payments.into_rows(),
        days,
    })
}

fn import_vat(sheet: &Sheet, links: &mut Links, order: DateOrder) -> Result<Vec<VatRecord>> {
    let map = ColumnMap::positional(sheet, VAT_COLUMNS)?;
    let mut records = KeyedRows::new();

    for row in sheet.rows_from(VAT_FIRST_ROW) {
        let Some(company) = company_name(map.get(row, "company"), OTHER_SKIP) else {
            continue;
        };
        let id = links.link(&company);
        let record = VatRecord {
            client_id: id.clone(),
            accounting_partner: Partner::classify(map.get(row, "partner")),
            application_date: normalize::date(map.get(row, "application"), order),
            approval_date: normalize::date(map.get(row, "approval"), order),
            return_deadlines: VAT_DEADLINES.map(|col| normalize::date(map.get(row, col), order)),
            payment_to_studio: normalize::text(map.get(row, "payment_studio")),
            payment_vat: normalize::text(map.get(row, "payment_vat")),
        };
        if records.upsert(id, record) {
            log::warn!(
                "Sheet '{}': '{}' resolves to a client already registered, keeping the later row",
                sheet.name,
                company
            );
        }
    }
    Ok(records.into_rows())
}

fn import_affinitas(sheet: &Sheet, order: DateOrder) -> Result<Vec<AffinitasSubscription>> {
    let map = ColumnMap::from_header(sheet, 0, AFFINITAS_HEADERS)?;
    let mut subscriptions = Vec::new();

    for row in sheet.rows_from(1) {
        // Without a reference the row cannot be told apart from export filler.
        let Some(raw_ref) = normalize::text(map.get(row, "subscription")) else {
            continue;
        };
        let (subscription_ref, company_name) = split_subscription_ref(&raw_ref);
        let notes = normalize::text(map.get(row, "notes"));
        let in_segreteria = !notes
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains("no in gestione"));

        subscriptions.push(AffinitasSubscription {
            subscription_ref,
            company_name,
            status: "Active",
            start_date: normalize::date_loose(map.get(row, "start_date"), order),
            next_payment: normalize::date_loose(map.get(row, "next_payment"), order),
            orders_count: normalize::integer(map.get(row, "orders")),
            notes,
            in_segreteria,
        });
    }
    Ok(subscriptions)
}

// ---------------------------------------------------------------------------
// Whole workbook
// ---------------------------------------------------------------------------

pub struct SourceSheets {
    pub clients: Sheet,
    pub subscriptions: Sheet,
    pub vat: Sheet,
    pub payments: Sheet,
    pub affinitas: Option<Sheet>,
}

pub fn load_sheets(workbook: &mut Workbook, settings: &Settings) -> Result<SourceSheets> {
    log::debug!("Workbook sheets: {:?}", workbook.sheet_names());
    let names = &settings.sheets;
    Ok(SourceSheets {
        clients: workbook.sheet(&names.clients)?,
        subscriptions: workbook.sheet(&names.subscriptions)?,
        vat: workbook.sheet(&names.vat)?,
        payments: workbook.sheet(&names.payments)?,
        affinitas: workbook.optional_sheet(&names.affinitas)?,
    })
}

pub fn import_sheets(sheets: &SourceSheets, settings: &Settings) -> Result<SeedData> {
    let order = settings.date_order;
    let year = settings.year;

    let mut clients = import_clients(&sheets.clients, order)?;
    let resolver = IdentityResolver::new(NameIndex::build(&clients), settings.match_strategy);
    log::info!("Indexed {} client names", resolver.index().len());
    let mut links = Links::new(&resolver);

    let mut terms = import_payments(&sheets.payments, &mut links, order)?;
    let subscriptions = import_subscriptions(&sheets.subscriptions, &mut links, year)?;
    let vat_records = import_vat(&sheets.vat, &mut links, order)?;
    let affinitas_subscriptions = match &sheets.affinitas {
        Some(sheet) => import_affinitas(sheet, order)?,
        None => Vec::new(),
    };

    let mut days = subscriptions.days;
    for client in &mut clients {
        if let Some(t) = terms.remove(&client.id) {
            client.start_date = t.start_date;
            client.service_cost = t.service_cost;
            client.notes = t.notes;
        }
        client.subscription_day = days.remove(&client.id);
    }
    if !terms.is_empty() {
        log::warn!(
            "Dropped payment terms for {} client(s) missing from the clients sheet",
            terms.len()
        );
    }
    if !days.is_empty() {
        log::warn!(
            "Dropped subscription day for {} client(s) missing from the clients sheet",
            days.len()
        );
    }

    let bank_statements = clients
        .iter()
        .flat_map(|c| {
            c.months_received.iter().map(move |(&month, &received)| BankStatement {
                client_id: c.id.clone(),
                year,
                month,
                received,
            })
        })
        .collect();

    log::info!(
        "Imported {} clients, {} subscription payments, {} VAT records, {} external subscriptions ({} orphan references)",
        clients.len(),
        subscriptions.payments.len(),
        vat_records.len(),
        affinitas_subscriptions.len(),
        links.orphans
    );

    Ok(SeedData {
        clients,
        bank_statements,
        subscription_payments: subscriptions.payments,
        vat_records,
        affinitas_subscriptions,
        orphan_refs: links.orphans,
    })
}

pub fn import_workbook(workbook: &mut Workbook, settings: &Settings) -> Result<SeedData> {
    let sheets = load_sheets(workbook, settings)?;
    import_sheets(&sheets, settings)
}
