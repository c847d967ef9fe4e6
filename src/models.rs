// Data models for the dashboard grids

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::record::{Column, FieldKind, FieldValue, Record};
use crate::sort::{SortDirection, SortSpec};

/// A money transfer between two parties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Short hash
    pub id: String,
    pub status: TransactionStatus,
    /// ISO-8601
    pub created_at: String,
    pub amount: f64,
    /// e.g. KGS, USD
    pub currency: String,
    pub sender: String,
    pub recipient: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Confirmed,
    Pending,
    Declined,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::Confirmed,
        TransactionStatus::Pending,
        TransactionStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Declined => "declined",
        }
    }

    /// Badge text shown in the status column
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Confirmed => "Подтверждено",
            TransactionStatus::Pending => "В ожидании",
            TransactionStatus::Declined => "Отклонено",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre::eyre!("Unknown transaction status: {}", s))
    }
}

const TRANSACTION_COLUMNS: &[Column] = &[
    Column {
        name: "id",
        label: "ID/tx_hash",
        kind: FieldKind::Text,
        sortable: true,
    },
    Column {
        name: "status",
        label: "Статус",
        kind: FieldKind::Category,
        sortable: true,
    },
    Column {
        name: "createdAt",
        label: "Дата",
        kind: FieldKind::Timestamp,
        sortable: true,
    },
    Column {
        name: "amount",
        label: "Сумма",
        kind: FieldKind::Amount,
        sortable: true,
    },
    Column {
        name: "currency",
        label: "Валюта",
        kind: FieldKind::Category,
        sortable: false,
    },
    Column {
        name: "sender",
        label: "Отправитель",
        kind: FieldKind::Text,
        sortable: false,
    },
    Column {
        name: "recipient",
        label: "Получатель",
        kind: FieldKind::Text,
        sortable: false,
    },
];

impl Record for Transaction {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "transactions"
    }

    fn columns() -> &'static [Column] {
        TRANSACTION_COLUMNS
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(&self.id)),
            "status" => Some(FieldValue::Category(self.status.as_str())),
            "createdAt" => Some(FieldValue::Timestamp(&self.created_at)),
            "amount" => Some(FieldValue::Amount(self.amount)),
            "currency" => Some(FieldValue::Category(&self.currency)),
            "sender" => Some(FieldValue::Text(&self.sender)),
            "recipient" => Some(FieldValue::Text(&self.recipient)),
            _ => None,
        }
    }

    fn search_fields() -> &'static [&'static str] {
        &["id", "sender", "recipient"]
    }

    fn default_sort() -> SortSpec {
        SortSpec::new("createdAt", SortDirection::Descending)
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ID", self.id.clone()),
            ("Статус", self.status.label().to_string()),
            ("Дата", format_timestamp(&self.created_at)),
            ("Сумма", format_amount(self.amount, &self.currency)),
            ("Отправитель", self.sender.clone()),
            ("Получатель", self.recipient.clone()),
        ]
    }
}

/// A dashboard administrator account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Email used to sign in
    pub login: String,
    pub role: String,
    /// ISO-8601
    pub created_at: String,
}

const ADMIN_COLUMNS: &[Column] = &[
    Column {
        name: "firstName",
        label: "Имя",
        kind: FieldKind::Text,
        sortable: true,
    },
    Column {
        name: "lastName",
        label: "Фамилия",
        kind: FieldKind::Text,
        sortable: true,
    },
    Column {
        name: "login",
        label: "Логин",
        kind: FieldKind::Text,
        sortable: true,
    },
    Column {
        name: "role",
        label: "Роль",
        kind: FieldKind::Category,
        sortable: false,
    },
    Column {
        name: "createdAt",
        label: "Создано",
        kind: FieldKind::Timestamp,
        sortable: true,
    },
];

impl Record for Admin {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "admins"
    }

    fn columns() -> &'static [Column] {
        ADMIN_COLUMNS
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(&self.id)),
            "firstName" => Some(FieldValue::Text(&self.first_name)),
            "lastName" => Some(FieldValue::Text(&self.last_name)),
            "login" => Some(FieldValue::Text(&self.login)),
            "role" => Some(FieldValue::Category(&self.role)),
            "createdAt" => Some(FieldValue::Timestamp(&self.created_at)),
            _ => None,
        }
    }

    fn search_fields() -> &'static [&'static str] {
        &["firstName", "lastName", "login"]
    }

    fn default_sort() -> SortSpec {
        SortSpec::new("createdAt", SortDirection::Descending)
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Имя", self.first_name.clone()),
            ("Фамилия", self.last_name.clone()),
            ("Логин", self.login.clone()),
            ("Роль", self.role.clone()),
            ("Создано", format_timestamp(&self.created_at)),
        ]
    }
}

/// Render an amount with two decimals, space-grouped thousands and the currency code
pub fn format_amount(amount: f64, currency: &str) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{},{} {}", sign, grouped, frac, currency)
}

/// Render an ISO timestamp as `dd.mm.yyyy, HH:MM:SS` (UTC); unparseable input is returned as-is
pub fn format_timestamp(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(dt) => dt.naive_utc().format("%d.%m.%Y, %H:%M:%S").to_string(),
        Err(_) => iso.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Timestamp `offset` seconds after 2024-01-01T00:00:00Z
    pub fn at(offset: i64) -> String {
        let base = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        (base + chrono::Duration::seconds(offset)).to_rfc3339()
    }

    pub fn tx(id: &str, status: TransactionStatus, amount: f64, currency: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            status,
            created_at: at(0),
            amount,
            currency: currency.to_string(),
            sender: "John Doe".to_string(),
            recipient: "Jane Smith".to_string(),
        }
    }

    pub fn admin(id: &str, first: &str, last: &str, login: &str) -> Admin {
        Admin {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            login: login.to_string(),
            role: "Супер админ".to_string(),
            created_at: at(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TransactionStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");

        let status: TransactionStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(status, TransactionStatus::Declined);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Pending".parse::<TransactionStatus>().unwrap(), TransactionStatus::Pending);
        assert!("lost".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_transaction_camel_case_json() {
        let t = tx("abc123", TransactionStatus::Pending, 10.5, "USD");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["createdAt"], serde_json::json!(t.created_at));
        assert_eq!(json["status"], "pending");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_transaction_fields() {
        let t = tx("abc123", TransactionStatus::Confirmed, 99.0, "KGS");
        assert_eq!(t.field("status"), Some(FieldValue::Category("confirmed")));
        assert_eq!(t.field("amount"), Some(FieldValue::Amount(99.0)));
        assert_eq!(t.field("currency"), Some(FieldValue::Category("KGS")));
        assert!(t.field("firstName").is_none());

        let sortable: Vec<&str> = Transaction::columns()
            .iter()
            .filter(|c| c.sortable)
            .map(|c| c.name)
            .collect();
        assert_eq!(sortable, vec!["id", "status", "createdAt", "amount"]);
    }

    #[test]
    fn test_admin_fields_and_details() {
        let a = admin("a1", "Елена", "Иванова", "elena@example.com");
        assert_eq!(a.field("firstName"), Some(FieldValue::Text("Елена")));
        assert_eq!(a.field("role"), Some(FieldValue::Category("Супер админ")));
        assert_eq!(Admin::default_sort().key, "createdAt");

        let details = a.details();
        assert_eq!(details[2], ("Логин", "elena@example.com".to_string()));
        assert_eq!(details[4].1, "01.01.2024, 00:00:00");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0, "USD"), "0,00 USD");
        assert_eq!(format_amount(1234567.891, "KGS"), "1 234 567,89 KGS");
        assert_eq!(format_amount(-150.5, "EUR"), "-150,50 EUR");
    }

    #[test]
    fn test_format_timestamp_passthrough() {
        assert_eq!(format_timestamp("garbage"), "garbage");
    }
}
