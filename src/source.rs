// Record sources: mock generation and JSON Lines files

use chrono::{Duration, SecondsFormat, Utc};
use eyre::{Context, Result};
use rand::Rng;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::models::{Admin, Transaction, TransactionStatus};
use crate::record::Record;

pub const DEFAULT_TRANSACTION_COUNT: usize = 250;
pub const DEFAULT_ADMIN_COUNT: usize = 150;

/// Age window for generated records
const CREATED_WITHIN_DAYS: i64 = 120;

const NAMES: &[&str] = &[
    "Арслан Бекболотов Мамыткысымович",
    "Асанов Асан Асанович",
    "Елена Иванова",
    "John Doe",
    "Jane Smith",
    "Алексей Петров",
    "Мария Сидорова",
];

const CURRENCIES: &[&str] = &["KGS", "USD", "EUR"];

/// (display name, login slug)
const FIRST_NAMES: &[(&str, &str)] = &[
    ("Арслан", "arslan"),
    ("Асан", "asan"),
    ("Елена", "elena"),
    ("John", "john"),
    ("Jane", "jane"),
    ("Алексей", "aleksei"),
    ("Мария", "maria"),
];

const LAST_NAMES: &[(&str, &str)] = &[
    ("Бекболотов", "bekbolotov"),
    ("Асанов", "asanov"),
    ("Иванова", "ivanova"),
    ("Doe", "doe"),
    ("Smith", "smith"),
    ("Петров", "petrov"),
    ("Сидорова", "sidorova"),
];

const ROLES: &[&str] = &["Супер админ", "Администратор", "Оператор"];

/// Records that can be produced as mock data
pub trait Generate: Record + Sized {
    fn generate_with_rng<G: Rng>(count: usize, rng: &mut G) -> Vec<Self>;

    fn generate(count: usize) -> Vec<Self> {
        Self::generate_with_rng(count, &mut rand::thread_rng())
    }
}

impl Generate for Transaction {
    fn generate_with_rng<G: Rng>(count: usize, rng: &mut G) -> Vec<Self> {
        (0..count)
            .map(|_| {
                let sender = pick(rng, NAMES);
                let mut recipient = pick(rng, NAMES);
                if recipient == sender {
                    recipient = pick(rng, NAMES);
                }
                Transaction {
                    id: short_hash(rng),
                    status: TransactionStatus::ALL[rng.gen_range(0..TransactionStatus::ALL.len())],
                    created_at: recent_timestamp(rng),
                    amount: rng.gen_range(0..100_000_000u64) as f64 / 100.0,
                    currency: pick(rng, CURRENCIES).to_string(),
                    sender: sender.to_string(),
                    recipient: recipient.to_string(),
                }
            })
            .collect()
    }
}

impl Generate for Admin {
    fn generate_with_rng<G: Rng>(count: usize, rng: &mut G) -> Vec<Self> {
        (0..count)
            .map(|n| {
                let (first, first_slug) = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
                let (last, last_slug) = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
                Admin {
                    id: uuid::Builder::from_random_bytes(rng.r#gen()).into_uuid().to_string(),
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    login: format!("{}.{}{}@example.com", first_slug, last_slug, n + 1),
                    role: pick(rng, ROLES).to_string(),
                    created_at: recent_timestamp(rng),
                }
            })
            .collect()
    }
}

pub fn generate_transactions(count: usize) -> Vec<Transaction> {
    Transaction::generate(count)
}

pub fn generate_admins(count: usize) -> Vec<Admin> {
    Admin::generate(count)
}

fn pick<G: Rng>(rng: &mut G, values: &[&'static str]) -> &'static str {
    values[rng.gen_range(0..values.len())]
}

/// 12 hex chars, like a shortened transaction hash
fn short_hash<G: Rng>(rng: &mut G) -> String {
    format!("{:012x}", rng.r#gen::<u64>() & 0xffff_ffff_ffff)
}

fn recent_timestamp<G: Rng>(rng: &mut G) -> String {
    let window_ms = Duration::days(CREATED_WITHIN_DAYS).num_milliseconds();
    let ago = Duration::milliseconds(rng.gen_range(0..window_ms));
    (Utc::now() - ago).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read records from a JSON Lines file, in file order
///
/// Blank lines are ignored and malformed ones skipped with a warning. A
/// repeated id replaces the earlier record in place.
pub fn read_jsonl<R: Record>(path: &Path) -> Result<Vec<R>> {
    let file = File::open(path).with_context(|| format!("Failed to open JSONL file {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records: Vec<R> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to read line, skipping"
                );
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let record: R = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    file = ?path,
                    line = line_num + 1,
                    error = ?e,
                    "Failed to parse JSON, skipping"
                );
                continue;
            }
        };

        match positions.get(record.id()) {
            Some(&pos) => records[pos] = record,
            None => {
                positions.insert(record.id().to_string(), records.len());
                records.push(record);
            }
        }
    }

    info!(
        file = ?path,
        collection = R::collection_name(),
        count = records.len(),
        "Loaded records from JSONL"
    );

    Ok(records)
}

/// Write records to a JSON Lines file, replacing its contents
pub fn write_jsonl<R: Record>(path: &Path, records: &[R]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create JSONL file {:?}", path))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let json = serde_json::to_string(record)?;
        writeln!(writer, "{}", json)?;
    }
    writer.flush().context("Failed to flush JSONL file")?;

    info!(file = ?path, count = records.len(), "Wrote records to JSONL");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_timestamp;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_transactions_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let records = Transaction::generate_with_rng(250, &mut rng);
        assert_eq!(records.len(), 250);

        let now = Utc::now().timestamp_millis();
        let oldest = now - Duration::days(CREATED_WITHIN_DAYS + 1).num_milliseconds();
        for t in &records {
            assert_eq!(t.id.len(), 12);
            assert!(t.id.chars().all(|c| c.is_ascii_hexdigit()));
            assert!((0.0..1_000_000.0).contains(&t.amount));
            assert!(CURRENCIES.contains(&t.currency.as_str()));
            let created = parse_timestamp(&t.created_at).unwrap();
            assert!(created <= now && created >= oldest);
        }
    }

    #[test]
    fn test_generation_is_seedable() {
        let a = Transaction::generate_with_rng(20, &mut StdRng::seed_from_u64(1));
        let b = Transaction::generate_with_rng(20, &mut StdRng::seed_from_u64(1));
        let ids_a: Vec<&str> = a.iter().map(|t| t.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_generate_admins_shape() {
        let admins = generate_admins(DEFAULT_ADMIN_COUNT);
        assert_eq!(admins.len(), 150);
        for a in &admins {
            assert!(a.login.ends_with("@example.com"));
            assert!(ROLES.contains(&a.role.as_str()));
            assert!(uuid::Uuid::parse_str(&a.id).is_ok());
        }
        assert!(generate_transactions(0).is_empty());
    }

    #[test]
    fn test_jsonl_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("transactions.jsonl");
        let records = Transaction::generate_with_rng(10, &mut StdRng::seed_from_u64(3));

        write_jsonl(&path, &records).unwrap();
        let loaded: Vec<Transaction> = read_jsonl(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_read_jsonl_skips_bad_lines_and_replaces_duplicates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("admins.jsonl");
        let content = r#"{"id":"a1","firstName":"John","lastName":"Doe","login":"j@x","role":"Оператор","createdAt":"2024-01-01T00:00:00Z"}

not json
{"id":"a2","firstName":"Jane","lastName":"Smith","login":"s@x","role":"Оператор","createdAt":"2024-01-02T00:00:00Z"}
{"id":"a1","firstName":"Johnny","lastName":"Doe","login":"j@x","role":"Оператор","createdAt":"2024-01-01T00:00:00Z"}
"#;
        fs::write(&path, content).unwrap();

        let loaded: Vec<Admin> = read_jsonl(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].first_name, "Johnny");
        assert_eq!(loaded[1].id, "a2");
    }

    #[test]
    fn test_read_jsonl_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let result: Result<Vec<Admin>> = read_jsonl(&temp.path().join("missing.jsonl"));
        assert!(result.is_err());
    }
}
