//! Output formatters
//!
//! Renders a provisioning plan as `KEY='value'` lines that CI backends can
//! source directly.
//!
//! | Variable            | Source                                      |
//! |---------------------|---------------------------------------------|
//! | `PACKAGING_COMMAND` | host facts                                  |
//! | `CCACHE`, `MAKE`, `NINJA`, `PYTHON`, `PIP3` | host facts (when set) |
//! | `CROSS_ARCH`, `CROSS_ABI` | cross target (cross builds only)       |
//! | `CROSS_ARCH_DEB`    | cross target on deb hosts                   |
//! | `PKGS`              | native install plan                         |
//! | `<MANAGER>_PKGS`    | secondary install plans (non-empty only)    |
//! | `CROSS_PKGS`        | foreign packages (non-empty only)           |
//! | `REMOVE_PKGS`       | native remove plan (non-empty only)         |

use crate::engine::pipeline::{ManagerPlan, ProvisionPlan};
use crate::logic::resolver::NATIVE_MANAGER;
use crate::types::{HostFacts, PackageAction};

/// Variable name a plan is exported under
pub fn variable_name(plan: &ManagerPlan) -> String {
    let prefix = if plan.manager_name == NATIVE_MANAGER {
        String::new()
    } else {
        format!("{}_", plan.manager_name.to_uppercase().replace('-', "_"))
    };

    match plan.action {
        PackageAction::Install => format!("{prefix}PKGS"),
        PackageAction::Remove => format!("{prefix}REMOVE_PKGS"),
    }
}

/// Quote a value for POSIX shells
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Build the `KEY='value'` lines for a host and its plan
pub fn format_variables(facts: &HostFacts, plan: &ProvisionPlan) -> Vec<String> {
    let mut vars: Vec<(String, String)> = vec![(
        "PACKAGING_COMMAND".to_string(),
        facts.packaging.command.clone(),
    )];

    let paths = &facts.paths;
    for (name, value) in [
        ("CCACHE", &paths.ccache),
        ("MAKE", &paths.make),
        ("NINJA", &paths.ninja),
        ("PYTHON", &paths.python),
        ("PIP3", &paths.pip3),
    ] {
        if let Some(value) = value {
            vars.push((name.to_string(), value.clone()));
        }
    }

    if let Some(cross) = &plan.cross {
        vars.push(("CROSS_ARCH".to_string(), cross.arch.clone()));
        vars.push(("CROSS_ABI".to_string(), cross.abi.clone()));
        if let Some(deb_arch) = &cross.deb_arch {
            vars.push(("CROSS_ARCH_DEB".to_string(), deb_arch.clone()));
        }
    }

    for manager_plan in &plan.plans {
        let is_native_install = manager_plan.manager_name == NATIVE_MANAGER
            && manager_plan.action == PackageAction::Install;
        if manager_plan.is_empty() && !is_native_install {
            continue;
        }
        vars.push((variable_name(manager_plan), manager_plan.packages.join(" ")));
    }

    vars.into_iter()
        .map(|(name, value)| format!("{name}={}", quote(&value)))
        .collect()
}
