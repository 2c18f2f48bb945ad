//! Fixture configs shared by the integration tests.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use wrapp_spec::{
    Arg, Arguments, ChildField, Config, ConfigDefinition, DynError, Field, Input, Ref, Spec,
};

#[derive(Debug, PartialEq)]
pub struct Value(pub i64);

/// Builds a [Value] from argument 0 or keyword `value`
pub fn value(args: &Arguments) -> Result<Value, DynError> {
    Ok(Value(*args.param::<i64>(0, "value")?))
}

/// Sum of all positional and keyword `i64` arguments
pub fn sum(args: &Arguments) -> Result<i64, DynError> {
    let mut total = 0;
    for index in 0..args.positional().len() {
        total += *args.get::<i64>(index)?;
    }
    for name in args.keyword().keys() {
        total += *args.kwarg::<i64>(name)?;
    }
    Ok(total)
}

/// Counts its calls, to observe when factories run
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);
impl Counter {
    pub fn calls(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Prototype spec returning the number of the call
    pub fn prototype(&self) -> Spec {
        let counter = self.0.clone();
        Spec::prototype(move |_: &Arguments| Ok(counter.fetch_add(1, Ordering::SeqCst))).into()
    }

    /// Singleton spec returning the number of the call
    pub fn singleton(&self) -> Spec {
        let counter = self.0.clone();
        Spec::singleton(move |_: &Arguments| Ok(counter.fetch_add(1, Ordering::SeqCst))).into()
    }

    /// Singleton spec failing on its first `failures` calls
    pub fn flaky(&self, failures: usize) -> Spec {
        let counter = self.0.clone();
        Spec::singleton(move |_: &Arguments| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            if call < failures {
                return Err(format!("call {call} failed").into());
            }
            Ok(Value(call as i64))
        })
        .into()
    }
}

pub struct BasicConfig;
impl BasicConfig {
    pub const X: Field<i64> = Field::new("x");
    pub const SINGLETON: Field<Value> = Field::new("singleton");
    pub const PROTOTYPE: Field<Value> = Field::new("prototype");
    pub const FORWARD: Field<Value> = Field::new("forward");
}
impl Config for BasicConfig {
    fn define(def: &mut ConfigDefinition) {
        def.object(Self::X, 1_i64)
            .spec(Self::SINGLETON, Spec::singleton(value).arg(Ref::to("x")))
            .spec(Self::PROTOTYPE, Spec::prototype(value).arg(Ref::to("x")))
            .spec(Self::FORWARD, Spec::forward("singleton"))
            .spec("prototype_forward", Spec::forward("prototype"));
    }
}

pub struct ParentConfig0;
impl ParentConfig0 {
    pub const BASIC: ChildField<BasicConfig> = ChildField::new("basic_config");
    pub const X_PLUS_TEN: Field<i64> = Field::new("x_plus_ten");
}
impl Config for ParentConfig0 {
    fn define(def: &mut ConfigDefinition) {
        def.child::<BasicConfig>(Self::BASIC);
        def.spec(
            Self::X_PLUS_TEN,
            Spec::singleton(sum).arg(Ref::to("basic_config.x")).arg(10_i64),
        )
        .spec("value", Spec::forward("basic_config.singleton"));
    }
}

pub struct ParentConfig1;
impl ParentConfig1 {
    pub const BASIC: ChildField<BasicConfig> = ChildField::new("basic");
}
impl Config for ParentConfig1 {
    fn define(def: &mut ConfigDefinition) {
        def.child::<BasicConfig>(Self::BASIC);
        def.spec("value", Spec::forward("basic.singleton"));
    }
}

/// Nests [BasicConfig] three times, directly and through both parents
pub struct GrandParentConfig;
impl GrandParentConfig {
    pub const PARENT0: ChildField<ParentConfig0> = ChildField::new("parent0");
    pub const PARENT1: ChildField<ParentConfig1> = ChildField::new("parent1");
    pub const BASIC: ChildField<BasicConfig> = ChildField::new("basic_config");
}
impl Config for GrandParentConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<ParentConfig0>(Self::PARENT0);
        def.child::<ParentConfig1>(Self::PARENT1);
        def.child::<BasicConfig>(Self::BASIC);
    }
}

#[derive(Debug)]
pub struct Engine {
    pub db_address: String,
}

#[derive(Debug)]
pub struct Car {
    pub engine: Arc<Engine>,
}

pub struct CarConfig;
impl CarConfig {
    pub const DB_ADDRESS: Field<String> = Field::new("db_address");
    pub const ENGINE: Field<Engine> = Field::new("engine");
    pub const CAR: Field<Car> = Field::new("car");
}
impl Config for CarConfig {
    fn define(def: &mut ConfigDefinition) {
        def.global_input(Self::DB_ADDRESS, Input::of::<String>().with_default("a"))
            .spec(
                Self::ENGINE,
                Spec::singleton(|args: &Arguments| {
                    Ok(Engine {
                        db_address: args.get::<String>(0)?.to_string(),
                    })
                })
                .arg(Ref::to("db_address")),
            )
            .spec(
                Self::CAR,
                Spec::singleton(|args: &Arguments| {
                    Ok(Car {
                        engine: args.get::<Engine>(0)?,
                    })
                })
                .arg(Ref::to("engine")),
            )
            .spec(
                "db_address_of_car",
                Spec::attr("car", |car: &Car| car.engine.db_address.clone()),
            );
    }
}

/// Config with a local input, supplied by whoever nests it
pub struct PortConfig;
impl Config for PortConfig {
    fn define(def: &mut ConfigDefinition) {
        def.local_input("port", Input::of::<i64>())
            .local_input("offset", Input::of::<i64>().with_default(0_i64))
            .spec(
                "effective_port",
                Spec::singleton(sum).arg(Ref::to("port")).arg(Ref::to("offset")),
            );
    }
}

pub struct PortParentConfig;
impl Config for PortParentConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<PortConfig>("primary").with("port", 8000_i64);
        def.child::<PortConfig>("secondary").with("port", 8000_i64);
    }
}

pub struct ConflictingPortsConfig;
impl Config for ConflictingPortsConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<PortConfig>("primary").with("port", 8000_i64);
        def.child::<PortConfig>("secondary").with("port", 9000_i64);
    }
}

/// Binds `offset` to its default at one site and relies on the default at the other
pub struct DefaultOffsetPortsConfig;
impl Config for DefaultOffsetPortsConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<PortConfig>("primary")
            .with("port", 8000_i64)
            .with("offset", 0_i64);
        def.child::<PortConfig>("secondary").with("port", 8000_i64);
    }
}

pub struct MistypedPortConfig;
impl Config for MistypedPortConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<PortConfig>("primary").with("port", "8000");
    }
}

pub struct MissingPortConfig;
impl Config for MissingPortConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<PortConfig>("primary");
    }
}

pub struct UnknownLocalInputConfig;
impl Config for UnknownLocalInputConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<PortConfig>("primary")
            .with("port", 1_i64)
            .with("host", "localhost");
    }
}

/// Declares `db_address` like [CarConfig], but is another type
pub struct OtherDbConfig;
impl Config for OtherDbConfig {
    fn define(def: &mut ConfigDefinition) {
        def.global_input("db_address", Input::of::<String>());
    }
}

pub struct CollidingGlobalsConfig;
impl Config for CollidingGlobalsConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<CarConfig>("car_config");
        def.child::<OtherDbConfig>("other");
    }
}

#[derive(Debug, PartialEq)]
pub struct Wrapper {
    pub x: i64,
    pub y: i64,
}

pub struct PartialKwargsConfig;
impl Config for PartialKwargsConfig {
    fn define(def: &mut ConfigDefinition) {
        def.spec(
            "partial",
            Spec::singleton_dict([("x", 1_i64), ("y", 2_i64)]),
        )
        .spec(
            "v",
            Spec::singleton(|args: &Arguments| {
                Ok(Wrapper {
                    x: *args.kwarg::<i64>("x")?,
                    y: *args.kwarg::<i64>("y")?,
                })
            })
            .kwarg("y", 99_i64)
            .lazy_kwargs(Ref::to("partial")),
        )
        .spec(
            "union",
            Spec::singleton_dict([("z", 3_i64), ("x", 10_i64)]).lazy_kwargs(Ref::to("partial")),
        )
        .spec("not_a_dict", 5_i64)
        .spec(
            "bad_lazy",
            Spec::singleton(sum).lazy_kwargs(Ref::to("not_a_dict")),
        );
    }
}

pub struct CollectionConfig;
impl Config for CollectionConfig {
    fn define(def: &mut ConfigDefinition) {
        def.object("x", 1_i64)
            .spec("y", Spec::singleton(sum).arg(Ref::to("x")).arg(1_i64))
            .spec(
                "list",
                Spec::singleton_list([
                    Arg::from(Ref::to("x")),
                    Arg::from(Ref::to("y")),
                    Arg::from(3_i64),
                ]),
            )
            .spec("tuple", Spec::singleton_tuple([Ref::to("x"), Ref::to("y")]))
            .spec(
                "dict",
                Spec::singleton_dict([("x", Ref::to("x")), ("y", Ref::to("y"))]),
            );
    }
}

/// Arguments given as inline specs instead of references
pub struct AnonymousConfig;
impl Config for AnonymousConfig {
    fn define(def: &mut ConfigDefinition) {
        def.object("x", 1_i64)
            .spec(
                "nested",
                Spec::singleton(value).arg(Spec::singleton(sum).arg(Ref::to("x")).arg(41_i64)),
            )
            .spec(
                "fresh",
                Spec::prototype(value).arg(Spec::singleton(sum).arg(Ref::to("x"))),
            );
    }
}

pub struct CycleConfig;
impl Config for CycleConfig {
    fn define(def: &mut ConfigDefinition) {
        def.spec("a", Spec::forward("b"))
            .spec("b", Spec::forward("a"));
    }
}

pub struct SelfReferenceConfig;
impl Config for SelfReferenceConfig {
    fn define(def: &mut ConfigDefinition) {
        def.spec("a", Spec::prototype(value).arg(Ref::to("a")));
    }
}

pub struct DanglingConfig;
impl Config for DanglingConfig {
    fn define(def: &mut ConfigDefinition) {
        def.spec("a", Spec::forward("missing"));
    }
}
