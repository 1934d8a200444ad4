use crate::auth::{TokenSource, TokenStore};
use crate::cli::AuthCommands;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands) -> Result<(), CliError> {
    let store = TokenStore::default();
    match command {
        AuthCommands::Login { token } => {
            let token = token.trim();
            if token.is_empty() {
                return Err(CliError::EmptyToken);
            }
            store
                .save(token)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Access token stored in the system keychain");
        }
        AuthCommands::Logout => {
            store
                .clear()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Signed out");
        }
        AuthCommands::Status => {
            let resolved = store
                .resolve(|key| std::env::var(key).ok())
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("{}", describe_token_source(resolved.map(|(_, source)| source)));
        }
    }
    Ok(())
}

pub fn describe_token_source(source: Option<TokenSource>) -> String {
    source.map_or_else(
        || "Not signed in. Run `mindmatch auth login --token <TOKEN>`.".to_string(),
        |source| format!("Signed in (token from {})", source.label()),
    )
}
