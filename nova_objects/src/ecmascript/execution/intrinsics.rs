// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Well-known intrinsic objects
//!
//! The prototypes, root Maps and well-known symbols every object created by
//! the engine hangs off. They are created once in [`Agent::new`].

use super::{Agent, ExceptionType};
use crate::ecmascript::{
    builtins::{
        array::create_array_length_accessor,
        ordinary::{
            add_property,
            elements_kind::{ElementsKind, FAST_ELEMENTS_KINDS, INITIAL_OBJECT_ELEMENTS_KIND},
            map::{InstanceType, Map, MapFlags},
            map_transitions::as_elements_kind,
            ordinary_object_create_from_map,
            property_details::PropertyAttributes,
            descriptor_array::{Accessor, Descriptor, DescriptorArray},
        },
    },
    types::{Object, ObjectKind, OrdinaryObject, PropertyKey, String, Symbol, Value},
};

/// Typed array element kinds, in the order of their constructors.
pub(crate) const TYPED_ARRAY_KINDS: [ElementsKind; 9] = [
    ElementsKind::Int8,
    ElementsKind::Uint8,
    ElementsKind::Uint8Clamped,
    ElementsKind::Int16,
    ElementsKind::Uint16,
    ElementsKind::Int32,
    ElementsKind::Uint32,
    ElementsKind::Float32,
    ElementsKind::Float64,
];

#[derive(Debug)]
pub(crate) struct Intrinsics {
    pub(crate) object_prototype: OrdinaryObject,
    pub(crate) function_prototype: OrdinaryObject,
    pub(crate) array_prototype: OrdinaryObject,
    pub(crate) array_buffer_prototype: OrdinaryObject,
    pub(crate) typed_array_prototype: OrdinaryObject,
    error_prototypes: Vec<(ExceptionType, OrdinaryObject)>,
    pub(crate) global_object: OrdinaryObject,
    /// Root Map of `{}` objects.
    pub(crate) object_map: Map,
    pub(crate) null_prototype_map: Map,
    pub(crate) function_map: Map,
    /// Initial array Map, with `PACKED_SMI_ELEMENTS`.
    pub(crate) array_map: Map,
    error_maps: Vec<(ExceptionType, Map)>,
    pub(crate) array_buffer_map: Map,
    typed_array_maps: Vec<(ElementsKind, Map)>,
    /// %Symbol.toPrimitive%
    pub(crate) to_primitive: Symbol,
    /// %Symbol.toStringTag%
    pub(crate) to_string_tag: Symbol,
}

impl Intrinsics {
    pub(crate) fn error_prototype(&self, kind: ExceptionType) -> OrdinaryObject {
        self.error_prototypes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, prototype)| *prototype)
            .expect("error prototype out of bounds")
    }

    pub(crate) fn error_map(&self, kind: ExceptionType) -> Map {
        self.error_maps
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, map)| *map)
            .expect("error map out of bounds")
    }

    pub(crate) fn typed_array_map(&self, kind: ElementsKind) -> Map {
        self.typed_array_maps
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, map)| *map)
            .expect("typed array map out of bounds")
    }

    /// Create every intrinsic and install them on `agent`.
    pub(crate) fn initialize(agent: &mut Agent) {
        let object_prototype_map = Map::create_root(
            agent,
            InstanceType::Object,
            None,
            0,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        object_prototype_map.set_flag(&mut agent.heap, MapFlags::PROTOTYPE_MAP, true);
        let object_prototype =
            ordinary_object_create_from_map(agent, object_prototype_map, ObjectKind::Ordinary);
        let proto = Some(object_prototype.into_object());

        let function_prototype = create_prototype(agent, proto, InstanceType::Function);
        let array_prototype = create_prototype(agent, proto, InstanceType::Object);
        let array_buffer_prototype = create_prototype(agent, proto, InstanceType::Object);
        let typed_array_prototype = create_prototype(agent, proto, InstanceType::Object);

        let base_error_prototype = create_prototype(agent, proto, InstanceType::Object);
        let mut error_prototypes = vec![(ExceptionType::Error, base_error_prototype)];
        for kind in ExceptionType::ALL {
            if kind != ExceptionType::Error {
                let prototype = create_prototype(
                    agent,
                    Some(base_error_prototype.into_object()),
                    InstanceType::Object,
                );
                error_prototypes.push((kind, prototype));
            }
        }

        let in_object = agent.options.initial_in_object_properties;
        let object_map = Map::create_root(
            agent,
            InstanceType::Object,
            proto,
            in_object,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        let null_prototype_map = Map::create_root(
            agent,
            InstanceType::Object,
            None,
            in_object,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        let function_map = Map::create_root(
            agent,
            InstanceType::Function,
            Some(function_prototype.into_object()),
            0,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        let array_map = Map::create_root(
            agent,
            InstanceType::Array,
            Some(array_prototype.into_object()),
            0,
            ElementsKind::PackedSmi,
            None,
        );
        let error_maps = error_prototypes
            .iter()
            .map(|(kind, prototype)| {
                let map = Map::create_root(
                    agent,
                    InstanceType::Error,
                    Some(prototype.into_object()),
                    1,
                    INITIAL_OBJECT_ELEMENTS_KIND,
                    None,
                );
                (*kind, map)
            })
            .collect();
        let array_buffer_map = Map::create_root(
            agent,
            InstanceType::ArrayBuffer,
            Some(array_buffer_prototype.into_object()),
            0,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        let typed_array_maps = TYPED_ARRAY_KINDS
            .iter()
            .map(|kind| {
                let map = Map::create_root(
                    agent,
                    InstanceType::TypedArray,
                    Some(typed_array_prototype.into_object()),
                    0,
                    *kind,
                    None,
                );
                (*kind, map)
            })
            .collect();

        let global_map = Map::create_root(
            agent,
            InstanceType::GlobalObject,
            proto,
            0,
            INITIAL_OBJECT_ELEMENTS_KIND,
            None,
        );
        global_map.set_flag(&mut agent.heap, MapFlags::DICTIONARY_MAP, true);
        global_map.set_flag(&mut agent.heap, MapFlags::STABLE, false);
        let global_object = ordinary_object_create_from_map(agent, global_map, ObjectKind::Global);

        let to_primitive = Symbol::new(agent, Some("Symbol.toPrimitive"));
        let to_string_tag = Symbol::new(agent, Some("Symbol.toStringTag"));

        agent.intrinsics = Some(Intrinsics {
            object_prototype,
            function_prototype,
            array_prototype,
            array_buffer_prototype,
            typed_array_prototype,
            error_prototypes,
            global_object,
            object_map,
            null_prototype_map,
            function_map,
            array_map,
            error_maps,
            array_buffer_map,
            typed_array_maps,
            to_primitive,
            to_string_tag,
        });

        // Arrays report `length` through a native accessor that behaves as a
        // data property.
        let length = PropertyKey::from_str(agent, "length");
        let length_accessor = create_array_length_accessor(agent, length);
        let descriptors = DescriptorArray::allocate(
            &mut agent.heap,
            vec![Descriptor::accessor_constant(
                length,
                Accessor::Native(length_accessor),
                PropertyAttributes::DONT_ENUM.union(PropertyAttributes::DONT_DELETE),
            )],
        );
        array_map.initialize_descriptors(&mut agent.heap, descriptors);
        agent.caches.initial_array_maps.clear();
        for kind in FAST_ELEMENTS_KINDS {
            let map = as_elements_kind(agent, array_map, kind);
            agent.caches.initial_array_maps.push((kind, map));
        }

        let hidden = PropertyAttributes::DONT_ENUM;
        for kind in ExceptionType::ALL {
            let prototype = agent.intrinsics().error_prototype(kind);
            let name_key = PropertyKey::from_str(agent, "name");
            let name = Value::String(String::from_str(agent, kind.name()));
            add_property(agent, prototype, name_key, name, hidden);
            let message_key = PropertyKey::from_str(agent, "message");
            let empty = Value::String(String::from_str(agent, ""));
            add_property(agent, prototype, message_key, empty, hidden);
        }

        let tag_key = PropertyKey::Symbol(to_string_tag);
        for (prototype, tag) in [
            (array_buffer_prototype, "ArrayBuffer"),
            (typed_array_prototype, "TypedArray"),
        ] {
            let tag = Value::String(String::from_str(agent, tag));
            add_property(
                agent,
                prototype,
                tag_key,
                tag,
                PropertyAttributes::DONT_ENUM.union(PropertyAttributes::READ_ONLY),
            );
        }

        // 19.1 Value Properties of the Global Object
        let fixed = PropertyAttributes::FROZEN.union(PropertyAttributes::DONT_ENUM);
        for (name, value) in [
            ("undefined", Value::Undefined),
            ("NaN", Value::Number(f64::NAN)),
            ("Infinity", Value::Number(f64::INFINITY)),
        ] {
            let key = PropertyKey::from_str(agent, name);
            add_property(agent, global_object, key, value, fixed);
        }
        let global_this = PropertyKey::from_str(agent, "globalThis");
        add_property(
            agent,
            global_object,
            global_this,
            global_object.into_value(),
            PropertyAttributes::DONT_ENUM,
        );
    }
}

/// Create an intrinsic prototype object on its own unshared prototype Map.
fn create_prototype(
    agent: &mut Agent,
    prototype: Option<Object>,
    instance_type: InstanceType,
) -> OrdinaryObject {
    let map = Map::create_root(
        agent,
        instance_type,
        prototype,
        0,
        INITIAL_OBJECT_ELEMENTS_KIND,
        None,
    );
    map.set_flag(&mut agent.heap, MapFlags::PROTOTYPE_MAP, true);
    let kind = match instance_type {
        InstanceType::Function => ObjectKind::Function(
            crate::ecmascript::builtins::builtin_function::FunctionData::empty(),
        ),
        _ => ObjectKind::Ordinary,
    };
    ordinary_object_create_from_map(agent, map, kind)
}

#[cfg(test)]
mod test {
    use crate::ecmascript::execution::{Agent, Options};

    #[test]
    fn array_maps_are_cached_per_fast_kind() {
        let agent = Agent::new(Options::default());
        let maps = &agent.caches.initial_array_maps;
        assert_eq!(maps.len(), 6);
        for (kind, map) in maps {
            assert_eq!(map.elements_kind(&agent), *kind);
            assert_eq!(map.number_of_own_descriptors(&agent), 1);
        }
        assert_eq!(maps[0].1, agent.intrinsics().array_map);
    }

    #[test]
    fn global_object_is_dictionary_mode() {
        let agent = Agent::new(Options::default());
        let global = agent.global_object();
        assert!(global.is_dictionary_mode(&agent));
        assert!(global.is_global(&agent));
    }
}
