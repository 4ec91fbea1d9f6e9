//! `doppel init`: First-time setup: config file and sample persona data.

use doppel_config::AppConfig;
use doppel_core::persona::{FACTS_FILE, STYLE_FILE, SUMMARY_FILE};
use std::path::{Path, PathBuf};

pub async fn run(data_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::active_path();

    println!("🪞 Doppel — First-Time Setup");
    println!("============================\n");

    if let Some(dir) = config_path.parent()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)?;
        println!("✅ Created config directory: {}", dir.display());
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run init.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = super::load_config()?;
    let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(&config.persona.data_dir));
    write_sample_persona(&data_dir)?;

    println!("\n📝 Next steps:");
    println!("   1. Edit the persona files in {}", data_dir.display());
    println!("   2. Set DOPPEL_API_KEY (or api_key in config.toml)");
    println!("   3. Run `doppel chat` or `doppel serve`");

    Ok(())
}

/// Create the persona directory with placeholder files, keeping any that
/// already exist.
pub(crate) fn write_sample_persona(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let samples = [
        (
            FACTS_FILE,
            concat!(
                "{\n",
                "  \"full_name\": \"Jane Q. Example\",\n",
                "  \"name\": \"Jane\"\n",
                "}\n",
            ),
        ),
        (
            SUMMARY_FILE,
            concat!(
                "Jane is a backend engineer with ten years of experience building\n",
                "distributed systems. She currently leads the storage team at a\n",
                "mid-sized fintech and mentors junior engineers.\n",
            ),
        ),
        (
            STYLE_FILE,
            concat!(
                "Friendly and direct. Short paragraphs. Uses concrete examples from\n",
                "past projects. Avoids buzzwords.\n",
            ),
        ),
    ];

    for (name, content) in samples {
        let path = dir.join(name);
        if path.exists() {
            println!("  {} exists, leaving it alone", path.display());
        } else {
            std::fs::write(&path, content)?;
            println!("✅ Created {}", path.display());
        }
    }
    Ok(())
}
