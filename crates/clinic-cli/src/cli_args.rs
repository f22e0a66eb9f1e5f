use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clinic_access::{
    default_permission_policy_path, default_state_dir, default_units_path, Role, Scope,
    PERMISSION_POLICY_PATH_ENV, PRINCIPAL_PATH_ENV, STATE_DIR_ENV, UNITS_PATH_ENV,
};

#[derive(Debug, Parser)]
#[command(
    name = "clinic-access",
    about = "Inspect clinic permissions and manage the active unit",
    version
)]
pub struct Cli {
    #[arg(
        long = "policy",
        env = PERMISSION_POLICY_PATH_ENV,
        default_value_os_t = default_permission_policy_path(),
        global = true,
        help = "Permission policy file. Built-in clinic grants are used when the file does not exist."
    )]
    pub policy_path: PathBuf,

    #[arg(
        long = "units",
        env = UNITS_PATH_ENV,
        default_value_os_t = default_units_path(),
        global = true,
        help = "Units file backing the unit directory."
    )]
    pub units_path: PathBuf,

    #[arg(
        long = "state-dir",
        env = STATE_DIR_ENV,
        default_value_os_t = default_state_dir(),
        global = true,
        help = "Directory holding per-principal session state such as the selected unit."
    )]
    pub state_dir: PathBuf,

    #[arg(long, global = true, help = "Render output as JSON.")]
    pub json: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// How the acting principal is supplied. `--role` takes precedence over `--principal-file`.
#[derive(Debug, Clone, Args)]
pub struct PrincipalArgs {
    #[arg(
        long = "principal-file",
        env = PRINCIPAL_PATH_ENV,
        help = "JSON principal as issued by the identity provider."
    )]
    pub principal_file: Option<PathBuf>,

    #[arg(long = "id", default_value = "local-operator")]
    pub id: String,

    #[arg(long = "role")]
    pub role: Option<Role>,

    #[arg(long = "unit", value_delimiter = ',', help = "Assigned unit id; repeatable or comma-separated.")]
    pub units: Vec<String>,

    #[arg(long = "requires-supervision")]
    pub requires_supervision: bool,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List configured grants per role.
    Grants {
        #[arg(long = "role")]
        role: Option<Role>,
    },
    /// Evaluate one permission for a principal.
    Check {
        resource: String,
        action: String,
        #[arg(long = "scope")]
        scope: Option<Scope>,
        #[command(flatten)]
        principal: PrincipalArgs,
    },
    /// List the units a principal can operate in.
    Units {
        #[command(flatten)]
        principal: PrincipalArgs,
    },
    /// Switch the principal's active unit and persist the choice.
    Switch {
        unit_id: String,
        #[command(flatten)]
        principal: PrincipalArgs,
    },
    /// Show the principal and their restored active unit.
    Whoami {
        #[command(flatten)]
        principal: PrincipalArgs,
    },
    /// Forget the principal's persisted unit selection.
    Logout {
        #[command(flatten)]
        principal: PrincipalArgs,
    },
    /// Print the effective permission table in policy file format.
    ExportPolicy,
}
