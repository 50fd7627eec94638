//! `omnipacker login` – save, show or delete the stored account login.

use anyhow::Result;
use omnipacker_core::credentials::CredentialStore;

use crate::cli::LoginAction;

pub fn run_login(action: LoginAction) -> Result<()> {
    let store = CredentialStore::open_default()?;
    match action {
        LoginAction::Save { username, password } => {
            store.save(&username, &password)?;
            println!("Saved login for {}.", username.trim());
        }
        LoginAction::Show => match store.load()? {
            Some(login) => println!("Saved login: {}", login.username),
            None => println!("No saved login."),
        },
        LoginAction::Delete => {
            store.delete()?;
            println!("Saved login deleted.");
        }
    }
    Ok(())
}
