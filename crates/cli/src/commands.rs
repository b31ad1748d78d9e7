use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use specwatch_agent::llm::{LlmReasoner, OllamaClient};
use specwatch_agent::router::IntentRouter;
use specwatch_core::config::AppConfig;
use specwatch_core::store::InMemoryRuleStore;

/// The canned requests `specwatch demo` walks through, one per intent.
pub const DEMO_QUERIES: &[&str] = &[
    "Create a new automation rule to detect 5G signals between 3400 and 3600 MHz",
    "I want to set up monitoring for LTE signals and send notifications when detected",
    "Update the frequency range of rule 'LTE Detector' to 1800-2100 MHz",
    "Disable the rule 'Energy Threshold Alert'",
    "Show me all automation rules that have spectralEnergy conditions",
    "List all active rules",
    "What is TDOA and how does it work for geolocation?",
    "Explain the difference between signalDetection and spectralEnergy conditions",
];

pub fn build_router(config: &AppConfig) -> anyhow::Result<IntentRouter> {
    let client = OllamaClient::new(&config.llm).context("could not build LLM client")?;
    let reasoner = Arc::new(LlmReasoner::new(client));
    let store = Arc::new(InMemoryRuleStore::with_seed_data());
    Ok(IntentRouter::new(reasoner, store, config.engine))
}

pub async fn query(router: &IntentRouter, text: &str) -> anyhow::Result<()> {
    println!("{}", router.handle(text).await);
    Ok(())
}

pub async fn demo(router: &IntentRouter) -> anyhow::Result<()> {
    for (index, text) in DEMO_QUERIES.iter().enumerate() {
        println!("--- [{}/{}] {text}", index + 1, DEMO_QUERIES.len());
        println!("{}\n", router.handle(text).await);
    }
    Ok(())
}

pub async fn repl(router: &IntentRouter) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    println!("Ask about RF spectrum automation rules (type 'quit' to exit).");

    loop {
        write!(stdout, "specwatch> ").context("could not write prompt")?;
        stdout.flush().context("could not flush prompt")?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).context("could not read input")?;
        if read == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text.to_ascii_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        println!("{}\n", router.handle(text).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::DEMO_QUERIES;

    #[test]
    fn demo_queries_cover_each_intent_family() {
        assert!(DEMO_QUERIES.len() >= 8);
        assert!(DEMO_QUERIES.iter().any(|query| query.contains("Create")));
        assert!(DEMO_QUERIES.iter().any(|query| query.contains("Disable")));
        assert!(DEMO_QUERIES.iter().any(|query| query.contains("Show me")));
        assert!(DEMO_QUERIES.iter().any(|query| query.contains("What is")));
    }
}
