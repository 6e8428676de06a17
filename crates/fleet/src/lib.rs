//! # fleet
//!
//! Lifecycle control for the instances of a templated systemd service
//! (`<service>@1`, `<service>@2`, ...).
//!
//! Instances are never created here. They are discovered by asking the
//! service manager for every unit matching `<service>@*.service`, and each
//! bulk operation issues its own fresh query before acting. Discovery and
//! action are separate commands, so an instance added or removed between the
//! two is missed or fails its step; that window is accepted.
//!
//! ## Example
//!
//! ```no_run
//! use fleet::{Fleet, Transition};
//! use procrun::SystemRunner;
//! use std::sync::Arc;
//!
//! let fleet = Fleet::new("egress", Arc::new(SystemRunner)).with_sudo(true);
//! for unit in fleet.list_instances()? {
//!     println!("{unit}");
//! }
//! fleet.bulk_transition(Transition::Restart)?;
//! fleet.enable_start(3)?;
//! # Ok::<(), fleet::Error>(())
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Transition, Verb};

use procrun::{CommandRunner, Invocation};
use std::sync::Arc;

/// Default service manager program.
pub const SYSTEMCTL: &str = "systemctl";

/// Controller for every instance of one templated service.
#[derive(Clone)]
pub struct Fleet {
    service: String,
    manager: String,
    sudo: bool,
    runner: Arc<dyn CommandRunner>,
}

impl Fleet {
    /// Controller for `<service>@N` units, using `systemctl` without sudo.
    pub fn new(service: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            service: service.into(),
            manager: SYSTEMCTL.to_string(),
            sudo: false,
            runner,
        }
    }

    /// Prefix every service manager call with `sudo`.
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Use a different service manager program.
    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = manager.into();
        self
    }

    /// Unit pattern matching every instance.
    pub fn pattern(&self) -> String {
        format!("{}@*.service", self.service)
    }

    /// Unit name of instance `number`.
    pub fn instance_name(&self, number: u32) -> String {
        format!("{}@{number}", self.service)
    }

    fn invocation<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Invocation {
        if self.sudo {
            Invocation::new("sudo").arg(&self.manager).args(args)
        } else {
            Invocation::new(&self.manager).args(args)
        }
    }

    /// Names of the currently registered instances, in the order the service
    /// manager lists them. No instances is an empty list, not an error.
    pub fn list_instances(&self) -> Result<Vec<String>> {
        let pattern = self.pattern();
        let query = self.invocation([
            "list-units",
            pattern.as_str(),
            "--all",
            "--no-legend",
            "--plain",
        ]);

        let output = self
            .runner
            .output(&query)
            .map_err(|source| Error::Discovery {
                pattern: pattern.clone(),
                source,
            })?;

        let units = parse_units(&output, &self.service);
        log::debug!("discovered {} unit(s) matching {pattern}", units.len());
        Ok(units)
    }

    /// Apply `transition` to every instance found by a fresh discovery query,
    /// in listed order. Stops at the first failing sub-action.
    ///
    /// Returns the instances that were transitioned.
    pub fn bulk_transition(&self, transition: Transition) -> Result<Vec<String>> {
        let instances = self.list_instances()?;
        let mut completed = Vec::with_capacity(instances.len());

        for instance in instances {
            self.apply(&instance, transition.steps(), &completed)?;
            completed.push(instance);
        }

        Ok(completed)
    }

    /// Enable then start instance `number`, without a discovery query.
    pub fn enable_start(&self, number: u32) -> Result<()> {
        self.apply(
            &self.instance_name(number),
            &[Verb::Enable, Verb::Start],
            &[],
        )
    }

    /// Disable then stop instance `number`, without a discovery query.
    pub fn disable_stop(&self, number: u32) -> Result<()> {
        self.apply(
            &self.instance_name(number),
            &[Verb::Disable, Verb::Stop],
            &[],
        )
    }

    fn apply(&self, instance: &str, steps: &[Verb], completed: &[String]) -> Result<()> {
        let mut applied: Option<Verb> = None;

        for &step in steps {
            log::info!("{} service: {instance}", step.progressive());
            let call = self.invocation([step.as_str(), instance]);

            if let Err(source) = self.runner.run(&call) {
                return Err(match applied {
                    None => Error::PartialFleetFailure {
                        instance: instance.to_string(),
                        step,
                        completed: completed.to_vec(),
                        source,
                    },
                    Some(applied) => Error::IntermediateState {
                        instance: instance.to_string(),
                        applied,
                        step,
                        completed: completed.to_vec(),
                        source,
                    },
                });
            }
            applied = Some(step);
        }

        Ok(())
    }
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("service", &self.service)
            .field("manager", &self.manager)
            .field("sudo", &self.sudo)
            .finish_non_exhaustive()
    }
}

/// Extract unit names from `list-units --no-legend` output.
///
/// The first whitespace-delimited token of every row is the unit name. Rows
/// whose first token is not a `<service>@` unit (legend or summary lines,
/// blank lines) are dropped.
pub fn parse_units(output: &str, service: &str) -> Vec<String> {
    let prefix = format!("{service}@");
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|unit| unit.starts_with(&prefix))
        .map(ToString::to_string)
        .collect()
}
