//! Service installation and fleet lifecycle tasks

use crate::tasks::TaskArgs;
use crate::ui;
use crate::workspace::Workspace;
use anyhow::{Result, bail};
use fleet::Transition;
use std::path::Path;
use std::sync::Arc;
use taskgraph::{Registry, Task};

const BULK: [(&str, &str, Transition); 6] = [
    ("start-all", "Start every instance", Transition::Start),
    ("stop-all", "Stop every instance", Transition::Stop),
    ("restart-all", "Restart every instance", Transition::Restart),
    ("enable-all", "Enable every instance", Transition::Enable),
    ("disable-all", "Disable every instance", Transition::Disable),
    (
        "stop-and-disable-all",
        "Disable then stop every instance",
        Transition::DisableStop,
    ),
];

pub fn register(
    registry: &mut Registry,
    ws: &Arc<Workspace>,
    args: &TaskArgs,
) -> taskgraph::Result<()> {
    let list_ws = Arc::clone(ws);
    registry.register(
        Task::new("list-instances", move |_| {
            let instances = list_ws.fleet().list_instances()?;
            if instances.is_empty() {
                ui::info(&format!("No {} instances", list_ws.config().service.name));
            }
            for instance in instances {
                println!("{instance}");
            }
            Ok(())
        })
        .describe("List registered service instances"),
    )?;

    for (name, description, transition) in BULK {
        let ws = Arc::clone(ws);
        registry.register(
            Task::new(name, move |_| bulk(&ws, transition)).describe(description),
        )?;
    }

    let instance = args.instance;
    let enable_ws = Arc::clone(ws);
    registry.register(
        Task::new("enable-instance", move |scope| {
            let Some(number) = instance else {
                bail!("{} needs an instance number", scope.task());
            };
            enable_ws.fleet().enable_start(number)?;
            let unit = enable_ws.fleet().instance_name(number);
            ui::success(&format!("Enabled and started {unit}"));
            Ok(())
        })
        .describe("Enable and start one instance"),
    )?;

    let disable_ws = Arc::clone(ws);
    registry.register(
        Task::new("disable-instance", move |scope| {
            let Some(number) = instance else {
                bail!("{} needs an instance number", scope.task());
            };
            disable_ws.fleet().disable_stop(number)?;
            let unit = disable_ws.fleet().instance_name(number);
            ui::success(&format!("Disabled and stopped {unit}"));
            Ok(())
        })
        .describe("Disable and stop one instance"),
    )?;

    let pulse_ws = Arc::clone(ws);
    registry.register(
        Task::new("configure-pulse", move |_| configure_pulse(&pulse_ws))
            .describe("Install and start the pulseaudio service"),
    )?;

    let service_ws = Arc::clone(ws);
    registry.register(
        Task::new("configure-service", move |_| configure_service(&service_ws))
            .describe("Install the service unit and start the first instance"),
    )?;

    let deploy_ws = Arc::clone(ws);
    registry.register(
        Task::new("deploy", move |_| deploy(&deploy_ws))
            .describe("Replace the installed binary and config, then restart"),
    )?;

    registry.register(
        Task::new("install", |scope| {
            scope.run("deploy")?;
            Ok(())
        })
        .describe("Build, configure and deploy the service")
        .depends_on(["build-locally", "configure-service"]),
    )
}

fn bulk(ws: &Workspace, transition: Transition) -> Result<()> {
    let done = ws.fleet().bulk_transition(transition)?;
    if done.is_empty() {
        ui::info(&format!("No {} instances", ws.config().service.name));
    } else {
        ui::success(&format!("{transition}: {} instance(s)", done.len()));
    }
    Ok(())
}

fn daemon_reload(ws: &Workspace) -> Result<()> {
    ws.run(ws.privileged(&ws.config().fleet.manager).arg("daemon-reload"))?;
    Ok(())
}

fn configure_pulse(ws: &Workspace) -> Result<()> {
    let service = &ws.config().service;
    let unit_file = service.pulse_unit_file.as_str();
    let unit = Path::new(unit_file)
        .file_stem()
        .map_or_else(|| unit_file.to_string(), |s| s.to_string_lossy().into_owned());
    let manager = &ws.config().fleet.manager;

    ui::step("Configuring pulseaudio");
    ws.run(ws.privileged("cp").args([
        unit_file.to_string(),
        format!("{}/{unit_file}", service.unit_dir),
    ]))?;
    daemon_reload(ws)?;
    ws.run(ws.privileged(manager).args(["enable", unit.as_str()]))?;
    ws.run(ws.privileged(manager).args(["start", unit.as_str()]))?;
    Ok(())
}

fn configure_service(ws: &Workspace) -> Result<()> {
    let service = &ws.config().service;
    let fleet = ws.fleet();

    // Installing over running instances is allowed
    if let Err(e) = fleet.bulk_transition(Transition::DisableStop) {
        log::warn!("Could not stop existing instances: {e}");
        ui::warn(&format!("Continuing after: {e}"));
    }

    ui::step(&format!("Installing {}@.service", service.name));
    ws.run(ws.privileged("cp").args([
        service.unit_file.clone(),
        format!("{}/{}@.service", service.unit_dir, service.name),
    ]))?;
    daemon_reload(ws)?;

    fleet.enable_start(service.first_instance)?;
    ui::success(&format!(
        "Started {}",
        fleet.instance_name(service.first_instance)
    ));
    Ok(())
}

fn deploy(ws: &Workspace) -> Result<()> {
    let service = &ws.config().service;

    ui::step("Deploying");
    for installed in [&service.install_binary, &service.install_config] {
        ws.run(ws.privileged("rm").args(["-rf", installed.as_str()]))?;
    }
    for (source, target) in [
        (&service.binary, &service.install_binary),
        (&service.config_file, &service.install_config),
    ] {
        ws.run(ws.privileged("cp").args([source.as_str(), target.as_str()]))?;
    }

    bulk(ws, Transition::Restart)
}
