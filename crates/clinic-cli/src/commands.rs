use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clinic_access::{
    evaluate_permission, load_permission_table, render_permission_policy, ActiveSession,
    FileSelectedUnitStore, Grant, IdentityProvider, JsonFileIdentityProvider, JsonFileUnitStore,
    Principal, Role, Scope, SelectedUnitStore, Unit, UnitDirectory, UnitSwitcher,
};
use serde_json::json;

use crate::cli_args::{Cli, CliCommand, PrincipalArgs};

pub(crate) async fn execute_cli(cli: &Cli) -> Result<String> {
    match &cli.command {
        CliCommand::Grants { role } => render_grants(cli, *role),
        CliCommand::Check {
            resource,
            action,
            scope,
            principal,
        } => {
            let principal = resolve_principal(principal).await?;
            render_check(cli, &principal, resource, action, *scope)
        }
        CliCommand::Units { principal } => {
            let principal = resolve_principal(principal).await?;
            render_units(cli, principal).await
        }
        CliCommand::Switch { unit_id, principal } => {
            let principal = resolve_principal(principal).await?;
            execute_switch(cli, principal, unit_id).await
        }
        CliCommand::Whoami { principal } => {
            let principal = resolve_principal(principal).await?;
            render_whoami(cli, principal).await
        }
        CliCommand::Logout { principal } => {
            let principal = resolve_principal(principal).await?;
            execute_logout(cli, &principal).await
        }
        CliCommand::ExportPolicy => {
            let table = load_permission_table(&cli.policy_path)?;
            Ok(render_permission_policy(&table)?.trim_end().to_string())
        }
    }
}

async fn resolve_principal(args: &PrincipalArgs) -> Result<Principal> {
    if let Some(role) = args.role {
        let id = args.id.trim();
        if id.is_empty() {
            bail!("principal id must not be empty");
        }
        return Ok(Principal::new(id, role)
            .with_units(
                args.units
                    .iter()
                    .map(|unit| unit.trim())
                    .filter(|unit| !unit.is_empty()),
            )
            .with_supervision(args.requires_supervision));
    }

    let Some(path) = args.principal_file.as_deref() else {
        bail!("a principal is required: pass --role or --principal-file");
    };
    JsonFileIdentityProvider::new(path)
        .current_principal()
        .await?
        .ok_or_else(|| anyhow!("no principal signed in: {} does not exist", path.display()))
}

async fn load_directory(units_path: &Path) -> Result<Arc<UnitDirectory>> {
    let mut directory = UnitDirectory::new();
    directory
        .load_units(&JsonFileUnitStore::new(units_path))
        .await?;
    Ok(Arc::new(directory))
}

fn switcher_for(
    cli: &Cli,
    principal: &Principal,
    directory: Arc<UnitDirectory>,
) -> (UnitSwitcher, FileSelectedUnitStore) {
    let store = FileSelectedUnitStore::for_principal(&cli.state_dir, &principal.id);
    let switcher = UnitSwitcher::new(directory, Arc::new(store.clone()));
    (switcher, store)
}

fn render_grants(cli: &Cli, role_filter: Option<Role>) -> Result<String> {
    let table = load_permission_table(&cli.policy_path)?;
    let roles = Role::ALL
        .into_iter()
        .filter(|role| role_filter.map_or(true, |filter| filter == *role))
        .collect::<Vec<_>>();

    if cli.json {
        let payload = roles
            .iter()
            .map(|role| {
                let grants = if role.is_admin() {
                    json!("implicit_all")
                } else {
                    json!(table.grants_for(*role))
                };
                (role.as_str().to_string(), grants)
            })
            .collect::<serde_json::Map<_, _>>();
        return Ok(json!({
            "policy_path": cli.policy_path.display().to_string(),
            "roles": payload,
        })
        .to_string());
    }

    let mut lines = vec![format!("grants: policy={}", cli.policy_path.display())];
    for role in roles {
        if role.is_admin() {
            lines.push(format!("role={} grants=implicit_all", role));
            continue;
        }
        let grants = table.grants_for(role);
        if grants.is_empty() {
            lines.push(format!("role={} grants=none", role));
            continue;
        }
        for grant in grants {
            lines.push(format!(
                "role={} resource={} action={} scope={}",
                role,
                grant.resource,
                grant.action,
                scope_label(grant.scope)
            ));
        }
    }
    Ok(lines.join("\n"))
}

fn render_check(
    cli: &Cli,
    principal: &Principal,
    resource: &str,
    action: &str,
    scope: Option<Scope>,
) -> Result<String> {
    let table = load_permission_table(&cli.policy_path)?;
    let decision = evaluate_permission(&table, Some(principal), resource, action, scope);

    Ok(if cli.json {
        json!({
            "principal": principal.id,
            "role": principal.role,
            "resource": resource,
            "action": action,
            "scope": scope,
            "decision": decision,
            "policy_path": cli.policy_path.display().to_string(),
        })
        .to_string()
    } else {
        format!(
            "permission check: principal={} role={} resource={} action={} scope={} decision={} reason_code={} matched_grant={} policy={}",
            principal.id,
            principal.role,
            resource,
            action,
            scope_label(scope),
            decision.label(),
            decision.reason_code(),
            decision
                .matched_grant()
                .map(Grant::to_string)
                .unwrap_or_else(|| "none".to_string()),
            cli.policy_path.display()
        )
    })
}

async fn render_units(cli: &Cli, principal: Principal) -> Result<String> {
    let directory = load_directory(&cli.units_path).await?;
    let (switcher, _) = switcher_for(cli, &principal, Arc::clone(&directory));
    let session = switcher.restore(principal).await;
    let accessible = directory.accessible_units(Some(session.principal()));

    if cli.json {
        return Ok(json!({
            "principal": session.principal().id,
            "current_unit": session.current_unit_id(),
            "units": accessible,
        })
        .to_string());
    }

    let mut lines = vec![format!(
        "units: principal={} accessible={} directory={} current={}",
        session.principal().id,
        accessible.len(),
        directory.len(),
        session.current_unit_id().unwrap_or("none")
    )];
    if accessible.is_empty() {
        lines.push("unit: none (no accessible units)".to_string());
    }
    for unit in accessible {
        lines.push(render_unit_line(unit, session.current_unit_id()));
    }
    Ok(lines.join("\n"))
}

async fn execute_switch(cli: &Cli, principal: Principal, unit_id: &str) -> Result<String> {
    let directory = load_directory(&cli.units_path).await?;
    let (switcher, store) = switcher_for(cli, &principal, directory);
    let mut session = switcher.restore(principal).await;
    let previous = session.current_unit_id().map(str::to_string);
    let unit = switcher.switch(&mut session, unit_id).await?;

    Ok(if cli.json {
        json!({
            "principal": session.principal().id,
            "previous_unit": previous,
            "current_unit": unit.id,
            "state_path": store.path().display().to_string(),
        })
        .to_string()
    } else {
        format!(
            "unit switch: principal={} previous={} current={} name={} path={}",
            session.principal().id,
            previous.as_deref().unwrap_or("none"),
            unit.id,
            unit.name,
            store.path().display()
        )
    })
}

async fn render_whoami(cli: &Cli, principal: Principal) -> Result<String> {
    let directory = load_directory(&cli.units_path).await?;
    let (switcher, _) = switcher_for(cli, &principal, directory);
    let session = switcher.restore(principal).await;
    let principal = session.principal();

    Ok(if cli.json {
        json!({
            "principal": principal,
            "role_label": principal.role.label(),
            "current_unit": session.current_unit(),
        })
        .to_string()
    } else {
        format!(
            "whoami: principal={} role={} label={} requires_supervision={} assigned_units={} current_unit={}",
            principal.id,
            principal.role,
            principal.role.label(),
            principal.requires_supervision,
            join_or_none(principal.assigned_unit_ids.iter().map(String::as_str)),
            session_unit_label(&session)
        )
    })
}

async fn execute_logout(cli: &Cli, principal: &Principal) -> Result<String> {
    let store = FileSelectedUnitStore::for_principal(&cli.state_dir, &principal.id);
    store.clear_selected_unit().await?;
    tracing::info!(principal = %principal.id, "unit selection cleared");
    Ok(format!(
        "logout: principal={} selection=cleared path={}",
        principal.id,
        store.path().display()
    ))
}

fn render_unit_line(unit: &Unit, current: Option<&str>) -> String {
    format!(
        "unit: id={} name={} timezone={} hours={}-{} specialties={} current={}",
        unit.id,
        unit.name,
        unit.settings.timezone,
        unit.settings.working_hours.start,
        unit.settings.working_hours.end,
        join_or_none(unit.settings.specialties.iter().map(String::as_str)),
        current == Some(unit.id.as_str())
    )
}

fn session_unit_label(session: &ActiveSession) -> String {
    match session.current_unit() {
        Some(unit) => format!("{} ({})", unit.id, unit.name),
        None => "none".to_string(),
    }
}

fn scope_label(scope: Option<Scope>) -> &'static str {
    scope.map(Scope::as_str).unwrap_or("any")
}

fn join_or_none<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let joined = values.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}
