//! `doppel doctor`: Diagnose configuration and backends.

use doppel_config::AppConfig;
use doppel_core::message::ConversationId;
use doppel_core::persona::PersonaProfile;
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Doppel Doctor — System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let config_path = AppConfig::active_path();
    if !config_path.exists() {
        println!("  ⚠️  No config file at {} — using defaults (run `doppel init`)", config_path.display());
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running further checks.");
            return Ok(());
        }
    };

    // Persona
    match PersonaProfile::load_dir(Path::new(&config.persona.data_dir)) {
        Ok(persona) => {
            let resume = if persona.resume_extract.is_some() { "with" } else { "without" };
            println!("  ✅ Persona loaded: {} ({resume} resume)", persona.full_name);
        }
        Err(e) => {
            println!("  ❌ Persona: {e}");
            issues += 1;
        }
    }

    // Storage
    match doppel_memory::build_from_config(&config.storage) {
        Ok(store) => {
            let probe = ConversationId::generate();
            match store.get(&probe).await {
                Ok(_) => println!("  ✅ Storage reachable ({})", store.name()),
                Err(e) => {
                    println!("  ❌ Storage ({}): {e}", store.name());
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Storage: {e}");
            issues += 1;
        }
    }

    // Inference
    if config.api_key.is_some() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured — set DOPPEL_API_KEY or api_key in config.toml");
        issues += 1;
    }

    match doppel_providers::build_from_config(&config) {
        Ok(gateway) => match gateway.health_check().await {
            Ok(true) => println!("  ✅ Model endpoint reachable ({})", config.resolved_api_url()),
            Ok(false) => {
                println!("  ⚠️  Model endpoint answered with an error ({})", config.resolved_api_url());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Model endpoint: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Inference gateway: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
