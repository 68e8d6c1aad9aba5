use clap::Parser;
use staffing::EmployeeId;
use staffing::permission::Role;

use crate::client::globalsettings::GlobalSettings;
use crate::repo::user;
use crate::service::auth::create_user;

#[derive(Parser)]
pub struct UserOpts {
    #[clap(subcommand)]
    pub subcmd: UserCommand,
}

#[derive(Parser)]
pub enum UserCommand {
    /// Create a user and print its API token
    Create(UserCreateOpts),
    /// List users
    List,
}

#[derive(Parser)]
pub struct UserCreateOpts {
    /// Login name
    pub username: String,

    /// One of `admin`, `resource_manager`, `project_manager`, `employee`
    #[arg(long)]
    pub role: Role,

    /// Employee record linked to the user
    #[arg(long)]
    pub employee_id: Option<EmployeeId>,
}

pub async fn command_user(gsettings: &GlobalSettings, opts: UserOpts) -> anyhow::Result<()> {
    let db = gsettings.open_database()?;
    match opts.subcmd {
        UserCommand::Create(opts) => {
            let (user, token) = db
                .transaction(move |tx| create_user(tx, &opts.username, opts.role, opts.employee_id))
                .await?;
            gsettings.printer().print_user_created(&user, &token);
        }
        UserCommand::List => {
            let users = db.call(|conn| user::list(conn)).await?;
            gsettings.printer().print_user_list(users);
        }
    }
    Ok(())
}
