//! Customer directory — phone-keyed KYC records.
//!
//! Backed by libSQL with a seeded synthetic dataset; an in-memory variant
//! exists for tests. A miss is `Ok(None)`, never an error.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use libsql::{Connection, params};
use tracing::info;

use crate::error::DirectoryError;

/// A directory (CRM) record for a known customer.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryRecord {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub age: i64,
    pub current_loans: serde_json::Value,
    pub credit_score: u32,
    pub pre_approved_limit: i64,
    pub employment_type: String,
    pub company_name: String,
    pub monthly_income: i64,
}

/// Read-only customer lookup service.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Look up a customer by phone. Absence is the `Ok(None)` branch.
    async fn lookup(&self, phone: &str) -> Result<Option<DirectoryRecord>, DirectoryError>;
}

/// The synthetic customer dataset seeded into every backend.
pub fn demo_customers() -> Vec<DirectoryRecord> {
    let row = |name: &str,
               phone: &str,
               email: &str,
               city: &str,
               age: i64,
               loans: serde_json::Value,
               credit_score: u32,
               pre_approved_limit: i64,
               employment_type: &str,
               company_name: &str,
               monthly_income: i64| DirectoryRecord {
        name: name.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
        city: city.to_string(),
        age,
        current_loans: loans,
        credit_score,
        pre_approved_limit,
        employment_type: employment_type.to_string(),
        company_name: company_name.to_string(),
        monthly_income,
    };

    vec![
        row(
            "Rajesh Kumar",
            "9876543210",
            "rajesh.kumar@email.com",
            "Mumbai",
            32,
            serde_json::json!([{"type": "home_loan", "amount": 2500000, "emi": 25000}]),
            785,
            500000,
            "salaried",
            "TCS Limited",
            85000,
        ),
        row(
            "Priya Sharma",
            "9876543211",
            "priya.sharma@email.com",
            "Delhi",
            28,
            serde_json::json!([]),
            720,
            300000,
            "salaried",
            "Infosys",
            65000,
        ),
        row(
            "Amit Patel",
            "9876543212",
            "amit.patel@email.com",
            "Bangalore",
            35,
            serde_json::json!([{"type": "car_loan", "amount": 800000, "emi": 18000}]),
            760,
            600000,
            "self_employed",
            "Own Business",
            120000,
        ),
        row(
            "Sunita Reddy",
            "9876543213",
            "sunita.reddy@email.com",
            "Hyderabad",
            30,
            serde_json::json!([]),
            680,
            250000,
            "salaried",
            "Wipro Technologies",
            55000,
        ),
        row(
            "Vikram Singh",
            "9876543214",
            "vikram.singh@email.com",
            "Pune",
            29,
            serde_json::json!([{"type": "personal_loan", "amount": 200000, "emi": 8500}]),
            740,
            400000,
            "salaried",
            "IBM India",
            75000,
        ),
        row(
            "Anjali Gupta",
            "9876543215",
            "anjali.gupta@email.com",
            "Chennai",
            33,
            serde_json::json!([]),
            800,
            700000,
            "salaried",
            "HCL Technologies",
            95000,
        ),
        row(
            "Rohit Joshi",
            "9876543216",
            "rohit.joshi@email.com",
            "Kolkata",
            27,
            serde_json::json!([]),
            650,
            200000,
            "salaried",
            "Tech Mahindra",
            48000,
        ),
        row(
            "Kavya Menon",
            "9876543217",
            "kavya.menon@email.com",
            "Kochi",
            31,
            serde_json::json!([{"type": "education_loan", "amount": 1200000, "emi": 15000}]),
            710,
            350000,
            "salaried",
            "Accenture",
            68000,
        ),
        row(
            "Arjun Nair",
            "9876543218",
            "arjun.nair@email.com",
            "Ahmedabad",
            34,
            serde_json::json!([]),
            770,
            550000,
            "self_employed",
            "Consultant",
            105000,
        ),
        row(
            "Deepika Agarwal",
            "9876543219",
            "deepika.agarwal@email.com",
            "Jaipur",
            26,
            serde_json::json!([]),
            690,
            280000,
            "salaried",
            "Capgemini",
            58000,
        ),
        row(
            "Manoj Yadav",
            "9876543220",
            "manoj.yadav@email.com",
            "Lucknow",
            36,
            serde_json::json!([{"type": "home_loan", "amount": 3000000, "emi": 28000}]),
            750,
            450000,
            "salaried",
            "L&T Infotech",
            82000,
        ),
        row(
            "Ritu Bansal",
            "9876543221",
            "ritu.bansal@email.com",
            "Chandigarh",
            29,
            serde_json::json!([]),
            730,
            380000,
            "salaried",
            "Cognizant",
            71000,
        ),
    ]
}

// ── libSQL backend ──────────────────────────────────────────────────────

/// libSQL-backed customer directory.
pub struct LibSqlDirectory {
    conn: Connection,
}

impl LibSqlDirectory {
    /// Open (or create) a local database file, create the schema, and seed
    /// the synthetic customers.
    pub async fn open_local(path: &Path) -> Result<Self, DirectoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DirectoryError::Open(format!("create directory dir: {e}")))?;
        }
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DirectoryError::Open(e.to_string()))?;
        let conn = db.connect().map_err(|e| DirectoryError::Open(e.to_string()))?;

        let directory = Self { conn };
        directory.init_schema().await?;
        directory.seed_demo_customers().await?;
        info!(path = %path.display(), "Customer directory opened");
        Ok(directory)
    }

    /// In-memory database, used by tests.
    pub async fn open_memory() -> Result<Self, DirectoryError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DirectoryError::Open(e.to_string()))?;
        let conn = db.connect().map_err(|e| DirectoryError::Open(e.to_string()))?;
        let directory = Self { conn };
        directory.init_schema().await?;
        directory.seed_demo_customers().await?;
        Ok(directory)
    }

    async fn init_schema(&self) -> Result<(), DirectoryError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS customers (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    phone TEXT UNIQUE NOT NULL,
                    email TEXT NOT NULL,
                    city TEXT NOT NULL,
                    age INTEGER NOT NULL,
                    current_loans TEXT NOT NULL,
                    credit_score INTEGER NOT NULL,
                    pre_approved_limit INTEGER NOT NULL,
                    employment_type TEXT NOT NULL,
                    company_name TEXT NOT NULL,
                    monthly_income INTEGER NOT NULL,
                    created_date TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn seed_demo_customers(&self) -> Result<(), DirectoryError> {
        for customer in demo_customers() {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO customers
                     (name, phone, email, city, age, current_loans, credit_score,
                      pre_approved_limit, employment_type, company_name, monthly_income, created_date)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        customer.name,
                        customer.phone,
                        customer.email,
                        customer.city,
                        customer.age,
                        customer.current_loans.to_string(),
                        customer.credit_score as i64,
                        customer.pre_approved_limit,
                        customer.employment_type,
                        customer.company_name,
                        customer.monthly_income,
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )
                .await
                .map_err(|e| DirectoryError::Query(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CustomerDirectory for LibSqlDirectory {
    async fn lookup(&self, phone: &str) -> Result<Option<DirectoryRecord>, DirectoryError> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, phone, email, city, age, current_loans, credit_score,
                        pre_approved_limit, employment_type, company_name, monthly_income
                 FROM customers WHERE phone = ?1",
                params![phone],
            )
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;

        let Some(row) = rows.next().await.map_err(|e| DirectoryError::Query(e.to_string()))? else {
            return Ok(None);
        };

        let malformed = |reason: String| DirectoryError::MalformedRow {
            phone: phone.to_string(),
            reason,
        };

        let loans_raw: String = row.get(5).map_err(|e| malformed(e.to_string()))?;
        let current_loans =
            serde_json::from_str(&loans_raw).unwrap_or_else(|_| serde_json::json!([]));
        let credit_score: i64 = row.get(6).map_err(|e| malformed(e.to_string()))?;

        Ok(Some(DirectoryRecord {
            name: row.get(0).map_err(|e| malformed(e.to_string()))?,
            phone: row.get(1).map_err(|e| malformed(e.to_string()))?,
            email: row.get(2).map_err(|e| malformed(e.to_string()))?,
            city: row.get(3).map_err(|e| malformed(e.to_string()))?,
            age: row.get(4).map_err(|e| malformed(e.to_string()))?,
            current_loans,
            credit_score: credit_score.max(0) as u32,
            pre_approved_limit: row.get(7).map_err(|e| malformed(e.to_string()))?,
            employment_type: row.get(8).map_err(|e| malformed(e.to_string()))?,
            company_name: row.get(9).map_err(|e| malformed(e.to_string()))?,
            monthly_income: row.get(10).map_err(|e| malformed(e.to_string()))?,
        }))
    }
}

// ── In-memory backend ───────────────────────────────────────────────────

/// In-memory directory, used as a test double.
#[derive(Default)]
pub struct InMemoryDirectory {
    records: HashMap<String, DirectoryRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-loaded with the synthetic customers.
    pub fn with_demo_customers() -> Self {
        let mut records = HashMap::new();
        for customer in demo_customers() {
            records.insert(customer.phone.clone(), customer);
        }
        Self { records }
    }

    pub fn insert(&mut self, record: DirectoryRecord) {
        self.records.insert(record.phone.clone(), record);
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryDirectory {
    async fn lookup(&self, phone: &str) -> Result<Option<DirectoryRecord>, DirectoryError> {
        Ok(self.records.get(phone).cloned())
    }
}
