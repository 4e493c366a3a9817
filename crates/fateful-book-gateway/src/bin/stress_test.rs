//! Session stress test — many visitors counseling at once against a running gateway.
//! Each visitor opens a session, talks until a prescription is issued (forced at the turn
//! limit), asks for the shadow and closes the session. Run with: cargo run --bin stress_test [base_url]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
const CONCURRENT_VISITORS: usize = 10;
const MAX_MESSAGES: usize = 20;

const CODES: &[&str] = &["INFP", "ENTJ", "ISTJ", "ESFP", "INTP", "ENFP", "ISFP", "ESTJ"];

const MESSAGES: &[&str] = &[
    "I can't sleep lately.",
    "Work has been heavy for months.",
    "I think I'm afraid of disappointing people.",
    "Maybe I just want some quiet.",
    "I used to read a lot, but not anymore.",
    "I want to feel lighter.",
];

#[derive(Default)]
struct Tally {
    requests: AtomicU32,
    failures: AtomicU32,
    prescriptions: AtomicU32,
}

async fn post(client: &Client, url: String, body: Value, tally: &Tally, latencies: &Mutex<Vec<u128>>) -> Option<Value> {
    tally.requests.fetch_add(1, Ordering::Relaxed);
    let start = Instant::now();
    let res = client.post(url).json(&body).send().await;
    latencies.lock().await.push(start.elapsed().as_millis());

    match res {
        Ok(resp) if resp.status().is_success() => resp.json::<Value>().await.ok(),
        _ => {
            tally.failures.fetch_add(1, Ordering::Relaxed);
            None
        }
    }
}

async fn visit(visitor: usize, base: String, client: Client, tally: Arc<Tally>, latencies: Arc<Mutex<Vec<u128>>>) {
    let code = CODES[visitor % CODES.len()];
    let Some(created) = post(&client, format!("{base}/api/sessions"), json!({ "personality": code }), &tally, &latencies).await
    else {
        return;
    };
    let Some(id) = created["id"].as_str().map(str::to_string) else {
        return;
    };

    for turn in 0..MAX_MESSAGES {
        let message = MESSAGES[(visitor + turn) % MESSAGES.len()];
        let Some(reply) = post(
            &client,
            format!("{base}/api/sessions/{id}/messages"),
            json!({ "message": message }),
            &tally,
            &latencies,
        )
        .await
        else {
            return;
        };
        if reply["phase"] == "done" {
            tally.prescriptions.fetch_add(1, Ordering::Relaxed);
            break;
        }
    }

    post(&client, format!("{base}/api/sessions/{id}/shadow"), json!({}), &tally, &latencies).await;

    tally.requests.fetch_add(1, Ordering::Relaxed);
    let closed = client.delete(format!("{base}/api/sessions/{id}")).send().await;
    if !closed.is_ok_and(|resp| resp.status().is_success()) {
        tally.failures.fetch_add(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() {
    let base = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    println!("[STRESS TEST] {} visitors against {} (ensure the gateway is running)", CONCURRENT_VISITORS, base);

    let client = Client::new();
    let tally = Arc::new(Tally::default());
    let latencies = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..CONCURRENT_VISITORS)
        .map(|visitor| {
            tokio::spawn(visit(
                visitor,
                base.clone(),
                client.clone(),
                Arc::clone(&tally),
                Arc::clone(&latencies),
            ))
        })
        .collect();
    for h in handles {
        let _ = h.await;
    }

    let total = tally.requests.load(Ordering::Relaxed);
    let failed = tally.failures.load(Ordering::Relaxed);
    let success_rate = if total > 0 {
        f64::from(total - failed) / f64::from(total) * 100.0
    } else {
        0.0
    };
    let latencies = latencies.lock().await;
    let avg_latency_ms = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u128>() as f64 / latencies.len() as f64
    };

    println!("[STRESS TEST] Success: {:.1}% | Average Latency: {:.0}ms", success_rate, avg_latency_ms);
    println!(
        "[STRESS TEST] Requests: {} | Failures: {} | Sessions prescribed: {}/{}",
        total,
        failed,
        tally.prescriptions.load(Ordering::Relaxed),
        CONCURRENT_VISITORS
    );
}
