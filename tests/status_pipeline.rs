use paddock::adapters::build_ecosystem;
use paddock::domain::TabSelection;
use paddock::parser::{StatusField, parse_machine_output};
use paddock::state::{NavEvent, advance_page, reduce};
use paddock::sync::{apply_machine_status, apply_resolved_name};

const GLOBAL_STATUS: &str = "\
1,,machine-id,A
1,,provider-name,libvirt
1,,state,running
1,,machine-home,/h/env1
1,,machine-id,B
1,,provider-name,libvirt
1,,state,running
1,,machine-home,/h/env1
";

fn seven_environment_sweep() -> String {
    let mut output = String::new();
    for index in 0..7 {
        output.push_str(&format!(
            "1,,machine-id,id{index}\n1,,provider-name,libvirt\n1,,state,running\n1,,machine-home,/h/env{index}\n"
        ));
    }
    output
}

#[test]
fn global_sweep_parses_into_a_single_environment() {
    let records = parse_machine_output(GLOBAL_STATUS);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].machine_id, "A");
    assert_eq!(records[1].machine_id, "B");

    let ecosystem = build_ecosystem(&records, 5).expect("sweep should build an ecosystem");
    assert_eq!(ecosystem.environments.len(), 1);
    assert_eq!(ecosystem.environments[0].name, "env1");
    assert_eq!(ecosystem.environments[0].machines.len(), 2);
}

#[test]
fn full_session_flow_survives_navigation_and_unordered_merges() {
    let records = parse_machine_output(&seven_environment_sweep());
    let mut ecosystem = build_ecosystem(&records, 5).expect("sweep should build an ecosystem");
    assert_eq!(ecosystem.pager.total_pages, 2);

    // Names resolve in arbitrary order after startup.
    assert!(apply_resolved_name(&mut ecosystem, "id3", "worker"));
    assert!(apply_resolved_name(&mut ecosystem, "id0", "primary"));
    assert_eq!(ecosystem.environments[0].machines[0].name, "primary");
    assert_eq!(ecosystem.environments[3].machines[0].name, "worker");

    // Walk to the last tab of page one; the next step is the More sentinel.
    for _ in 0..4 {
        reduce(&mut ecosystem, NavEvent::PageForward);
    }
    assert_eq!(ecosystem.selection, TabSelection::Env(4));
    reduce(&mut ecosystem, NavEvent::PageForward);
    assert_eq!(ecosystem.selection, TabSelection::More);

    advance_page(&mut ecosystem);
    assert_eq!(ecosystem.selection, TabSelection::Env(5));

    // A status refresh for a machine on another page still merges.
    let status = parse_machine_output(
        "1,primary,metadata,provider,libvirt\n2,primary,provider-name,libvirt\n3,primary,state,power_off\n",
    )
    .into_iter()
    .next()
    .expect("status should parse");
    assert!(apply_machine_status(&mut ecosystem, "id0", &status));

    let merged = &ecosystem.environments[0].machines[0];
    assert_eq!(merged.state, "power off");
    assert_eq!(merged.home, "/h/env0");
    assert_eq!(merged.machine_id, "id0");
}

#[test]
fn machine_records_expose_only_whitelisted_fields() {
    let records = parse_machine_output(
        "1,web,metadata,provider,libvirt\n2,web,provider-name,libvirt\n3,web,ssh-config,ignored\n4,web,state,running\n",
    );
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].field(StatusField::ProviderName), "libvirt");
    assert_eq!(records[0].field(StatusField::State), "running");
    assert_eq!(records[0].fields.len(), 2);
}
