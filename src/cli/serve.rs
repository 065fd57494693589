//! Backend server startup command

use daemon_ai_core::{
    api::ApiServer, catalog::BUILTIN_DAEMON_IDS, config::AppConfig, error::Result,
};
use tracing::debug;

/// Handle `daemon-ai serve`
pub async fn handle(config: AppConfig) -> Result<()> {
    debug!("Starting daemon backend...");
    let server = ApiServer::new(config.clone())?;

    println!();
    println!("Daemon AI Backend");
    println!();
    println!("   Address: http://{}", config.server_addr);
    println!("   Built-in daemons: {}", BUILTIN_DAEMON_IDS.join(", "));
    println!(
        "   LLM: {} ({})",
        config.llm_base_url,
        if config.has_api_key() {
            "key configured"
        } else {
            "no key, fallbacks only"
        }
    );
    println!();
    println!("   Endpoints:");
    println!("   • GET    /health - Health check");
    println!("   • GET    /daemons - List daemons");
    println!("   • POST   /daemons - Add a daemon");
    println!("   • DELETE /daemons/{{id}} - Delete a daemon");
    println!("   • POST   /suggestion/{{id}} - One daemon's suggestion");
    println!("   • POST   /suggestions - Every daemon's suggestion");
    println!("   • POST   /apply-suggestion - Rewrite around a suggestion");
    println!("   • POST   /answer - Elaborate on a suggestion");
    println!();

    server.serve().await?;
    Ok(())
}
