use anyhow::Context;
use clap::{Args, Subcommand};

use crate::cli::OutputFormat;
use crate::config;
use crate::database::models::{RoleFlags, User};
use crate::database::{CatalogStore, DatabaseManager, PgCatalogStore};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Show a user and their role flags")]
    Show {
        #[arg(help = "Username")]
        username: String,
    },

    #[command(about = "Turn role flags on")]
    Grant {
        #[arg(help = "Username")]
        username: String,
        #[command(flatten)]
        roles: RoleArgs,
    },

    #[command(about = "Turn role flags off")]
    Revoke {
        #[arg(help = "Username")]
        username: String,
        #[command(flatten)]
        roles: RoleArgs,
    },
}

#[derive(Debug, Args)]
pub struct RoleArgs {
    #[arg(long)]
    pub admin: bool,
    #[arg(long)]
    pub supplier: bool,
    #[arg(long)]
    pub customer: bool,
}

impl RoleArgs {
    /// Flags named on the command line are set to `value`; others are untouched
    pub fn to_flags(&self, value: bool) -> RoleFlags {
        let pick = |named: bool| named.then_some(value);
        RoleFlags {
            is_admin: pick(self.admin),
            is_supplier: pick(self.supplier),
            is_customer: pick(self.customer),
        }
    }

    fn is_empty(&self) -> bool {
        !(self.admin || self.supplier || self.customer)
    }
}

fn describe(user: &User) -> String {
    format!(
        "{} (id {}, {}) admin={} supplier={} customer={} active={}",
        user.username, user.id, user.email, user.is_admin, user.is_supplier, user.is_customer, user.is_active
    )
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config::config().database).await?;
    let store = PgCatalogStore::new(pool);

    let user = match cmd {
        UserCommands::Show { username } => store
            .find_user_by_username(&username)
            .await?
            .with_context(|| format!("user '{}' not found", username))?,
        UserCommands::Grant { username, roles } | UserCommands::Revoke { username, roles }
            if roles.is_empty() =>
        {
            anyhow::bail!("no role flags given for '{}'; pass --admin, --supplier or --customer", username)
        }
        UserCommands::Grant { username, roles } => {
            let user = store.set_user_roles(&username, roles.to_flags(true)).await?;
            tracing::info!("Granted {:?} to '{}'", roles, username);
            user
        }
        UserCommands::Revoke { username, roles } => {
            let user = store.set_user_roles(&username, roles.to_flags(false)).await?;
            tracing::info!("Revoked {:?} from '{}'", roles, username);
            user
        }
    };

    store.pool().close().await;
    output_format.emit(&user, || describe(&user))
}
