//! Honeypot Registry — decoy routes that only probes ever request.
//!
//! A hit on a registered decoy is conclusive: it yields a
//! maximum-confidence `honeypot_access` finding regardless of payload, and
//! the caller serves believable fake content instead of a 404 so the visitor
//! keeps digging.

use crate::types::*;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const MAX_ALERTS: usize = 5_000;
const MAX_VISITORS_PER_DECOY: usize = 10_000;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecoyRoute {
    pub path: String,
    pub hits: u64,
    pub last_hit: Option<i64>,
    pub visitors: HashSet<String>,
}

/// The standard decoy set: paths attackers probe on every blog install.
const DEFAULT_DECOYS: &[&str] = &[
    "/admin/login.php",
    "/wp-admin/admin.php",
    "/phpmyadmin/index.php",
    "/.env",
    "/config.php",
    "/backup.sql",
    "/test.php",
    "/debug.log",
];

pub struct HoneypotRegistry {
    decoys: RwLock<HashMap<String, DecoyRoute>>,
    alerts: RwLock<Vec<DetectionAlert>>,
    total_hits: AtomicU64,
    enabled: bool,
}

impl Default for HoneypotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HoneypotRegistry {
    pub fn new() -> Self {
        let registry = Self {
            decoys: RwLock::new(HashMap::new()),
            alerts: RwLock::new(Vec::new()),
            total_hits: AtomicU64::new(0),
            enabled: true,
        };
        for path in DEFAULT_DECOYS {
            registry.register(path);
        }
        registry
    }

    pub fn register(&self, path: &str) {
        self.decoys.write().insert(
            path.to_string(),
            DecoyRoute { path: path.to_string(), hits: 0, last_hit: None, visitors: HashSet::new() },
        );
    }

    pub fn is_decoy(&self, path: &str) -> bool {
        self.enabled && self.decoys.read().contains_key(path)
    }

    /// Record a hit and produce the finding. Returns None for paths that
    /// are not registered decoys.
    pub fn record_hit(&self, path: &str, source_ip: &str, now: i64) -> Option<Finding> {
        if !self.enabled {
            return None;
        }
        let mut decoys = self.decoys.write();
        let decoy = decoys.get_mut(path)?;
        decoy.hits += 1;
        decoy.last_hit = Some(now);
        if decoy.visitors.len() < MAX_VISITORS_PER_DECOY {
            decoy.visitors.insert(source_ip.to_string());
        }
        let hits = decoy.hits;
        drop(decoys);

        self.total_hits.fetch_add(1, Ordering::Relaxed);
        warn!(path = %path, source = %source_ip, hits, "Honeypot hit");
        self.add_alert(now, Severity::Critical, "Honeypot hit", &format!("{} <- {}", path, source_ip));

        Some(Finding::new(
            source_ip,
            AttackType::HoneypotAccess,
            format!("honeypot:{}", path),
            path,
            now,
        ))
    }

    /// Fake content served in place of the decoy resource.
    pub fn decoy_content(&self, path: &str) -> String {
        match path {
            "/admin/login.php" => concat!(
                "<!DOCTYPE html>\n",
                "<html><head><title>Admin Login</title></head>\n",
                "<body>\n",
                "<h1>Administrator Login</h1>\n",
                "<form method=\"post\">\n",
                "    <input type=\"text\" name=\"username\" placeholder=\"Username\">\n",
                "    <input type=\"password\" name=\"password\" placeholder=\"Password\">\n",
                "    <button type=\"submit\">Login</button>\n",
                "</form>\n",
                "</body></html>\n"
            )
            .to_string(),
            "/.env" => concat!(
                "DB_HOST=localhost\n",
                "DB_DATABASE=production_db\n",
                "DB_USERNAME=admin\n",
                "DB_PASSWORD=super_secret_password_123\n",
                "APP_KEY=base64:fake_key_for_honeypot\n",
                "JWT_SECRET=fake_jwt_secret\n"
            )
            .to_string(),
            "/backup.sql" => concat!(
                "-- MySQL dump (fake)\n",
                "-- Host: localhost    Database: production\n",
                "CREATE TABLE users (\n",
                "    id int PRIMARY KEY,\n",
                "    username varchar(50),\n",
                "    password varchar(255),\n",
                "    email varchar(100)\n",
                ");\n",
                "INSERT INTO users VALUES (1, 'admin', 'md5_fake_hash', 'admin@example.com');\n"
            )
            .to_string(),
            _ => "<html><body><h1>Access Denied</h1></body></html>".to_string(),
        }
    }

    pub fn decoys(&self) -> Vec<DecoyRoute> {
        self.decoys.read().values().cloned().collect()
    }

    pub fn total_hits(&self) -> u64 {
        self.total_hits.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> Vec<DetectionAlert> {
        self.alerts.read().clone()
    }

    pub fn set_enabled(&mut self, e: bool) {
        self.enabled = e;
    }

    fn add_alert(&self, ts: i64, sev: Severity, title: &str, details: &str) {
        let mut a = self.alerts.write();
        if a.len() >= MAX_ALERTS {
            a.remove(0);
        }
        a.push(DetectionAlert {
            timestamp: ts,
            severity: sev,
            component: "honeypot_registry".into(),
            title: title.into(),
            details: details.into(),
        });
    }
}
