// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use console::style;
use nova_objects::ecmascript::{
    builtins::ordinary::{
        map::Map,
        property_details::{PropertyAttributes, PropertyKind, PropertyLocation},
        transitions::TransitionKey,
    },
    execution::Agent,
};

/// Print `root` and every Map reachable from it through transitions.
pub fn print_transition_tree(agent: &Agent, root: Map) {
    println!("{}", map_label(agent, root));
    print_children(agent, root, "");
}

fn print_children(agent: &Agent, map: Map, indent: &str) {
    let transitions = map.transitions(agent);
    let count = transitions.len();
    for (i, (key, target)) in transitions.into_iter().enumerate() {
        let last = i + 1 == count;
        let (branch, continuation) = if last { ("└─", "   ") } else { ("├─", "│  ") };
        println!(
            "{indent}{branch} {} -> {}",
            edge_label(agent, key, target),
            map_label(agent, target)
        );
        print_children(agent, target, &format!("{indent}{continuation}"));
    }
}

fn edge_label(agent: &Agent, key: TransitionKey, target: Map) -> String {
    match key {
        TransitionKey::Property {
            key,
            kind,
            attributes,
        } => {
            let name = key.as_display(agent);
            let kind = match kind {
                PropertyKind::Data => "",
                PropertyKind::Accessor => " accessor",
            };
            // The property a transition adds is the target's last own
            // descriptor.
            let representation = target
                .number_of_own_descriptors(agent)
                .checked_sub(1)
                .map(|index| target.descriptors(agent).get_details(agent.heap(), index))
                .filter(|details| details.location() == PropertyLocation::Field)
                .map_or("", |details| details.representation().mnemonic());
            format!(
                "{}{kind} [{}] {representation}",
                style(name).bold(),
                attribute_letters(attributes)
            )
        }
        TransitionKey::Special(special) => style(format!("{special:?}")).magenta().to_string(),
    }
}

/// `wec` for writable, enumerable and configurable; a dash for each missing
/// attribute.
fn attribute_letters(attributes: PropertyAttributes) -> String {
    [
        (attributes.is_read_only(), 'w'),
        (attributes.is_dont_enum(), 'e'),
        (attributes.is_dont_delete(), 'c'),
    ]
    .into_iter()
    .map(|(missing, letter)| if missing { '-' } else { letter })
    .collect()
}

fn map_label(agent: &Agent, map: Map) -> String {
    let mut label = format!(
        "{map:?} {:?} in-object {}",
        map.elements_kind(agent),
        map.in_object_properties(agent)
    );
    if map.is_deprecated(agent) {
        label.push_str(&style(" deprecated").red().to_string());
    }
    if map.is_dictionary_map(agent) {
        label.push_str(&style(" dictionary").yellow().to_string());
    }
    if !map.is_stable(agent) {
        label.push_str(&style(" unstable").dim().to_string());
    }
    label
}
