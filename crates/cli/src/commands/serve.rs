//! `doppel serve`: Start the HTTP chat server.

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🪞 Doppel Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Persona:   {}", config.persona.data_dir);
    println!("   Storage:   {}", config.storage.backend);
    println!("   Model:     {} ({})", config.model, config.provider);

    doppel_gateway::start(config).await?;

    Ok(())
}
