use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::error;

use yksudo::api::{ProvisionReport, RunMode};
use yksudo::{ProvisionConfig, ProvisionError};

#[derive(Parser, Debug)]
#[command(name = "yksudo")]
#[command(about = "Require a hardware key touch for sudo on Debian WSL", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Run every check, but only log the changes that would be made
    #[arg(long)]
    pub dry_run: bool,

    /// Enroll the key again even if a credential already exists
    #[arg(long)]
    pub re_enroll: bool,

    /// Account to enroll (defaults to SUDO_USER)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,
}

impl Cli {
    fn config(&self) -> ProvisionConfig {
        ProvisionConfig::default()
            .with_mode(RunMode::from_flags(self.dry_run, self.re_enroll))
            .with_user(self.user.clone())
            .with_sudo_user(yksudo::api::sudo_user_from_env())
    }
}

fn print_report(report: &ProvisionReport, dry_run: bool) {
    println!();
    if dry_run {
        println!("Dry run finished; nothing was changed.");
    } else {
        println!("sudo now requires the hardware key.");
    }
    for (step, status) in &report.steps {
        println!("  {:<28} {}", step.to_string(), status);
    }
    if let Some(user) = &report.user {
        println!("  enrolled user: {}", user.name);
    }
    if let Some(credential) = &report.credential {
        println!("  credential:    {}", credential.display());
    }

    println!();
    println!("The key must be attached to WSL from Windows after every reboot or 'wsl --shutdown':");
    println!("  usbipd attach --wsl --distribution Debian --busid <BUSID>");
    println!();
    println!("Test (keep this shell open until it works):");
    println!("  sudo -k; sudo whoami");
    println!();
    println!("Recovery if sudo stops working:");
    println!("  wsl -u root");
    println!("  cp /etc/pam.d/sudo.bak /etc/pam.d/sudo");
}

fn report_failure(err: &ProvisionError) {
    error!("{} failed: {}", err.stage(), err);
    eprintln!();
    eprintln!("{}", err.hint());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.tracing_level_filter())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();
    let dry_run = config.mode.is_dry_run();

    match yksudo::provision_with_config(config) {
        Ok(report) => {
            print_report(&report, dry_run);
            Ok(())
        }
        Err(err) => {
            report_failure(&err);
            Err(err).context("provisioning stopped; fix the cause above and re-run")
        }
    }
}
