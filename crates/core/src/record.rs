//! Flat domain records exported by the studio's spreadsheets.
//!
//! Every field is optional: exports are hand-maintained and routinely carry
//! blanks, numbers-as-strings and inconsistently formatted dates. Records are
//! read through the [`Record`] trait so aggregation code never touches a raw
//! field directly.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::date::parse_flexible_date;

/// Label used when every field in a fallback chain is blank.
pub const UNKNOWN: &str = "Unknown";

// ── Dimensions / measures ─────────────────────────────────────

/// Categorical (or date-derived) field a record can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Month,
    Year,
    Location,
    Trainer,
    ClassFormat,
    Product,
    Category,
    PaymentMethod,
    Source,
    Stage,
    Associate,
    ConversionStatus,
    RetentionStatus,
    TrialStatus,
    Member,
    SoldBy,
}

impl Dimension {
    /// Date dimensions are bucketed from the record's parsed date rather
    /// than read from a text field.
    pub fn is_date(&self) -> bool {
        matches!(self, Dimension::Month | Dimension::Year)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Month => write!(f, "month"),
            Dimension::Year => write!(f, "year"),
            Dimension::Location => write!(f, "location"),
            Dimension::Trainer => write!(f, "trainer"),
            Dimension::ClassFormat => write!(f, "classFormat"),
            Dimension::Product => write!(f, "product"),
            Dimension::Category => write!(f, "category"),
            Dimension::PaymentMethod => write!(f, "paymentMethod"),
            Dimension::Source => write!(f, "source"),
            Dimension::Stage => write!(f, "stage"),
            Dimension::Associate => write!(f, "associate"),
            Dimension::ConversionStatus => write!(f, "conversionStatus"),
            Dimension::RetentionStatus => write!(f, "retentionStatus"),
            Dimension::TrialStatus => write!(f, "trialStatus"),
            Dimension::Member => write!(f, "member"),
            Dimension::SoldBy => write!(f, "soldBy"),
        }
    }
}

/// Numeric measure summed by accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    Revenue,
    Vat,
    Discount,
    Capacity,
    CheckedIn,
    Booked,
    LateCancelled,
    Ltv,
    Visits,
    Sessions,
    EmptySessions,
    Customers,
    NewCustomers,
    Converted,
    Retained,
    TrialsCompleted,
}

/// Identifying value collected into per-group uniqueness sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Identity {
    MemberId,
    Email,
    /// Member id, falling back to email; the same chain as [`Dimension::Member`].
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Sale,
    Session,
    Lead,
    Client,
    Cancellation,
    Payroll,
}

impl RecordKind {
    /// Whether records of this kind carry the given dimension at all.
    pub fn has_dimension(&self, dim: Dimension) -> bool {
        use Dimension::*;
        if dim.is_date() {
            return true;
        }
        match self {
            RecordKind::Sale => {
                matches!(dim, Location | Product | Category | PaymentMethod | SoldBy | Member)
            }
            RecordKind::Session => matches!(dim, Location | Trainer | ClassFormat),
            RecordKind::Lead => matches!(
                dim,
                Location | Source | Stage | Associate | ConversionStatus | TrialStatus | Member
            ),
            RecordKind::Client => matches!(
                dim,
                Location | Trainer | Product | ConversionStatus | RetentionStatus | Member
            ),
            RecordKind::Cancellation => matches!(
                dim,
                Location | Trainer | ClassFormat | Product | Category | PaymentMethod | Member
            ),
            RecordKind::Payroll => matches!(dim, Trainer | Location),
        }
    }

    /// Dated by month label rather than by day.
    pub fn is_month_grained(&self) -> bool {
        matches!(self, RecordKind::Payroll)
    }

    pub fn has_ltv(&self) -> bool {
        matches!(self, RecordKind::Lead | RecordKind::Client)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Sale => write!(f, "Sale"),
            RecordKind::Session => write!(f, "Session"),
            RecordKind::Lead => write!(f, "Lead"),
            RecordKind::Client => write!(f, "Client"),
            RecordKind::Cancellation => write!(f, "Cancellation"),
            RecordKind::Payroll => write!(f, "Payroll"),
        }
    }
}

// ── Record trait ──────────────────────────────────────────────

/// Uniform read access over every record variant.
pub trait Record {
    fn kind(&self) -> RecordKind;

    /// The variant's primary date field, unparsed.
    fn date_raw(&self) -> Option<&str>;

    /// Parsed primary date; `None` when blank or malformed.
    fn date(&self) -> Option<NaiveDateTime> {
        self.date_raw().and_then(parse_flexible_date)
    }

    /// Raw categorical value after applying the variant's fallback chain.
    ///
    /// Returns `None` when no field in the chain is filled in, when the
    /// dimension does not apply to the variant, and for date dimensions.
    fn dimension(&self, dim: Dimension) -> Option<&str>;

    /// Numeric measure; absent, malformed and inapplicable values are `0.0`.
    fn measure(&self, measure: Measure) -> f64;

    fn identity(&self, id: Identity) -> Option<&str>;
}

/// Trimmed, non-blank view of an optional text field.
fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// First non-blank value in a fallback chain.
fn first_present<'a>(chain: &[&'a Option<String>]) -> Option<&'a str> {
    chain.iter().find_map(|v| present(*v))
}

fn num(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn eq_label(v: &Option<String>, label: &str) -> bool {
    present(v).is_some_and(|s| s.eq_ignore_ascii_case(label))
}

/// Spreadsheet-style yes/no columns ("Yes", "TRUE", "New", "1").
fn truthy(v: &Option<String>) -> bool {
    present(v).is_some_and(|s| {
        matches!(
            s.to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1" | "new"
        )
    })
}

// ── Lenient field decoding ────────────────────────────────────

/// Accept numbers, numeric strings ("1,250.00") and nulls; anything else
/// decodes to `None` instead of failing the whole record.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '₹' && *c != '%')
                .collect();
            cleaned.trim().parse::<f64>().ok().filter(|x| x.is_finite())
        }
        _ => None,
    })
}

/// Accept strings, numbers and booleans as text (ids are often numeric).
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// ── Sale ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaleRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sale_item_id: Option<String>,
    pub payment_date: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_vat: Option<f64>,
    pub payment_method: Option<String>,
    pub payment_item: Option<String>,
    pub cleaned_product: Option<String>,
    pub cleaned_category: Option<String>,
    pub calculated_location: Option<String>,
    pub sold_by: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub discount_amount: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub discount_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub mrp_post_tax: Option<f64>,
}

impl Record for SaleRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Sale
    }

    fn date_raw(&self) -> Option<&str> {
        present(&self.payment_date)
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Location => present(&self.calculated_location),
            Dimension::Product => first_present(&[&self.cleaned_product, &self.payment_item]),
            Dimension::Category => present(&self.cleaned_category),
            Dimension::PaymentMethod => present(&self.payment_method),
            Dimension::SoldBy => present(&self.sold_by),
            Dimension::Member => first_present(&[&self.member_id, &self.customer_email]),
            _ => None,
        }
    }

    fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Revenue => num(self.payment_value),
            Measure::Vat => num(self.payment_vat),
            Measure::Discount => num(self.discount_amount),
            _ => 0.0,
        }
    }

    fn identity(&self, id: Identity) -> Option<&str> {
        match id {
            Identity::MemberId => present(&self.member_id),
            Identity::Email => present(&self.customer_email),
            Identity::Member => self.dimension(Dimension::Member),
        }
    }
}

// ── Session ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub cleaned_class: Option<String>,
    pub class_type: Option<String>,
    pub trainer_name: Option<String>,
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub capacity: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub checked_in_count: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub booked_count: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub late_cancelled_count: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_paid: Option<f64>,
}

impl Record for SessionRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Session
    }

    fn date_raw(&self) -> Option<&str> {
        present(&self.date)
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Location => present(&self.location),
            Dimension::Trainer => present(&self.trainer_name),
            Dimension::ClassFormat => first_present(&[&self.cleaned_class, &self.class_type]),
            _ => None,
        }
    }

    fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Sessions => 1.0,
            Measure::EmptySessions => flag(num(self.checked_in_count) <= 0.0),
            Measure::Capacity => num(self.capacity),
            Measure::CheckedIn => num(self.checked_in_count),
            Measure::Booked => num(self.booked_count),
            Measure::LateCancelled => num(self.late_cancelled_count),
            Measure::Revenue => num(self.total_paid),
            _ => 0.0,
        }
    }

    fn identity(&self, _id: Identity) -> Option<&str> {
        None
    }
}

// ── Lead ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    pub source: Option<String>,
    pub stage: Option<String>,
    pub associate: Option<String>,
    pub center: Option<String>,
    pub created_at: Option<String>,
    pub conversion_status: Option<String>,
    pub trial_status: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ltv: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub visits: Option<f64>,
}

impl LeadRecord {
    pub fn is_converted(&self) -> bool {
        eq_label(&self.conversion_status, "Converted")
    }

    /// Trial statuses arrive as "Completed", "Trial Completed", "completed".
    pub fn trial_completed(&self) -> bool {
        present(&self.trial_status).is_some_and(|s| s.to_ascii_lowercase().contains("completed"))
    }
}

impl Record for LeadRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Lead
    }

    fn date_raw(&self) -> Option<&str> {
        present(&self.created_at)
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Location => present(&self.center),
            Dimension::Source => present(&self.source),
            Dimension::Stage => present(&self.stage),
            Dimension::Associate => present(&self.associate),
            Dimension::ConversionStatus => present(&self.conversion_status),
            Dimension::TrialStatus => present(&self.trial_status),
            Dimension::Member => first_present(&[&self.id, &self.email]),
            _ => None,
        }
    }

    fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Ltv => num(self.ltv),
            Measure::Visits => num(self.visits),
            Measure::Converted => flag(self.is_converted()),
            Measure::TrialsCompleted => flag(self.trial_completed()),
            _ => 0.0,
        }
    }

    fn identity(&self, id: Identity) -> Option<&str> {
        match id {
            Identity::MemberId => present(&self.id),
            Identity::Email => present(&self.email),
            Identity::Member => self.dimension(Dimension::Member),
        }
    }
}

// ── Client (new-client conversion) ────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub first_visit_date: Option<String>,
    pub first_visit_location: Option<String>,
    pub home_location: Option<String>,
    pub trainer_name: Option<String>,
    pub membership_used: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_new: Option<String>,
    pub conversion_status: Option<String>,
    pub retention_status: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ltv: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub visits_post_trial: Option<f64>,
}

impl ClientRecord {
    pub fn is_new_member(&self) -> bool {
        truthy(&self.is_new)
    }

    pub fn is_converted(&self) -> bool {
        eq_label(&self.conversion_status, "Converted")
    }

    pub fn is_retained(&self) -> bool {
        eq_label(&self.retention_status, "Retained")
    }
}

impl Record for ClientRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Client
    }

    fn date_raw(&self) -> Option<&str> {
        present(&self.first_visit_date)
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Location => {
                first_present(&[&self.first_visit_location, &self.home_location])
            }
            Dimension::Trainer => present(&self.trainer_name),
            Dimension::Product => present(&self.membership_used),
            Dimension::ConversionStatus => present(&self.conversion_status),
            Dimension::RetentionStatus => present(&self.retention_status),
            Dimension::Member => first_present(&[&self.member_id, &self.email]),
            _ => None,
        }
    }

    fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Ltv => num(self.ltv),
            Measure::Visits => num(self.visits_post_trial),
            Measure::NewCustomers => flag(self.is_new_member()),
            Measure::Converted => flag(self.is_converted()),
            Measure::Retained => flag(self.is_retained()),
            _ => 0.0,
        }
    }

    fn identity(&self, id: Identity) -> Option<&str> {
        match id {
            Identity::MemberId => present(&self.member_id),
            Identity::Email => present(&self.email),
            Identity::Member => self.dimension(Dimension::Member),
        }
    }
}

// ── Late cancellation ─────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancellationRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub member_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub cleaned_product: Option<String>,
    pub cleaned_category: Option<String>,
    pub cleaned_class: Option<String>,
    pub class_type: Option<String>,
    pub teacher_name: Option<String>,
    #[serde(rename = "dateIST")]
    pub date_ist: Option<String>,
    pub cancelled_time: Option<String>,
    pub payment_method_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub is_new: Option<String>,
}

impl Record for CancellationRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Cancellation
    }

    fn date_raw(&self) -> Option<&str> {
        present(&self.date_ist)
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Location => present(&self.location),
            Dimension::Trainer => present(&self.teacher_name),
            Dimension::ClassFormat => first_present(&[&self.cleaned_class, &self.class_type]),
            Dimension::Product => present(&self.cleaned_product),
            Dimension::Category => present(&self.cleaned_category),
            Dimension::PaymentMethod => present(&self.payment_method_name),
            Dimension::Member => first_present(&[&self.member_id, &self.email]),
            _ => None,
        }
    }

    fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::LateCancelled => 1.0,
            Measure::NewCustomers => flag(truthy(&self.is_new)),
            _ => 0.0,
        }
    }

    fn identity(&self, id: Identity) -> Option<&str> {
        match id {
            Identity::MemberId => present(&self.member_id),
            Identity::Email => present(&self.email),
            Identity::Member => self.dimension(Dimension::Member),
        }
    }
}

// ── Payroll (per trainer, per month) ──────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayrollRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub teacher_id: Option<String>,
    pub teacher_name: Option<String>,
    pub teacher_email: Option<String>,
    pub location: Option<String>,
    pub month_year: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub empty_sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub non_empty_sessions: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_customers: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_paid: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub new_customers: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub converted_customers: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub retained_customers: Option<f64>,
}

impl Record for PayrollRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Payroll
    }

    fn date_raw(&self) -> Option<&str> {
        present(&self.month_year)
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        match dim {
            Dimension::Trainer => first_present(&[&self.teacher_name, &self.teacher_email]),
            Dimension::Location => present(&self.location),
            _ => None,
        }
    }

    fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Sessions => num(self.total_sessions),
            Measure::EmptySessions => num(self.empty_sessions),
            Measure::Customers => num(self.total_customers),
            Measure::Revenue => num(self.total_paid),
            Measure::NewCustomers => num(self.new_customers),
            Measure::Converted => num(self.converted_customers),
            Measure::Retained => num(self.retained_customers),
            _ => 0.0,
        }
    }

    fn identity(&self, _id: Identity) -> Option<&str> {
        None
    }
}

// ── Tagged union ──────────────────────────────────────────────

/// Any record variant, tagged by `kind` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DomainRecord {
    Sale(SaleRecord),
    Session(SessionRecord),
    Lead(LeadRecord),
    Client(ClientRecord),
    Cancellation(CancellationRecord),
    Payroll(PayrollRecord),
}

impl DomainRecord {
    fn inner(&self) -> &dyn Record {
        match self {
            DomainRecord::Sale(r) => r,
            DomainRecord::Session(r) => r,
            DomainRecord::Lead(r) => r,
            DomainRecord::Client(r) => r,
            DomainRecord::Cancellation(r) => r,
            DomainRecord::Payroll(r) => r,
        }
    }
}

impl Record for DomainRecord {
    fn kind(&self) -> RecordKind {
        self.inner().kind()
    }

    fn date_raw(&self) -> Option<&str> {
        self.inner().date_raw()
    }

    fn dimension(&self, dim: Dimension) -> Option<&str> {
        self.inner().dimension(dim)
    }

    fn measure(&self, measure: Measure) -> f64 {
        self.inner().measure(measure)
    }

    fn identity(&self, id: Identity) -> Option<&str> {
        self.inner().identity(id)
    }
}
