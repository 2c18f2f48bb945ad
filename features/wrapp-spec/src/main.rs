use std::error::Error;

use wrapp_spec::{
    build_container, instantiate_config, Arguments, ChildField, Config, ConfigDefinition, DynError,
    Field, GlobalInputs, Input, Ref, Spec,
};

fn main() -> Result<(), Box<dyn Error>> {
    let config = instantiate_config::<CarConfig>(GlobalInputs::new().set("db_address", "db-west"))?;

    // Switch every consumer of the engine to the mock before anything is built
    config.set("engine_config.engine", Spec::forward("mock_engine"))?;

    let container = build_container(&config)?;
    println!("{}", container.graph());

    let car = container.config::<CarConfig>()?.get(CarConfig::CAR)?;
    println!("{:?} with {} seats", car.engine, car.seats);

    let engine = container.require::<Engine>("engine_config.engine")?;
    let db_engine = container.require::<Engine>("engine_config.db_engine")?;
    if let Engine::Db { address } = &*db_engine {
        println!("Unused database engine points at {address}");
    }
    println!("Car shares its engine: {}", std::sync::Arc::ptr_eq(&car.engine, &engine));

    // Perturbation is over once the container exists
    if let Err(error) = config.set_value("engine_config.db_address", "db-east") {
        println!("{error}");
    }

    Ok(())
}

#[derive(Debug)]
enum Engine {
    Db { address: String },
    Mock,
}

#[derive(Debug)]
struct Car {
    engine: std::sync::Arc<Engine>,
    seats: usize,
}

struct EngineConfig;
impl EngineConfig {
    const ENGINE: Field<Engine> = Field::new("engine");
}
impl Config for EngineConfig {
    fn define(def: &mut ConfigDefinition) {
        def.global_input("db_address", Input::of::<String>().with_default("localhost"))
            .spec(
                "db_engine",
                Spec::singleton(|args: &Arguments| {
                    let address = args.get::<String>(0)?;
                    Ok(Engine::Db {
                        address: address.to_string(),
                    })
                })
                .arg(Ref::to("db_address")),
            )
            .spec(
                "mock_engine",
                Spec::singleton(|_: &Arguments| Ok(Engine::Mock)),
            )
            .spec(Self::ENGINE, Spec::forward("db_engine"));
    }
}

struct CarConfig;
impl CarConfig {
    const ENGINE_CONFIG: ChildField<EngineConfig> = ChildField::new("engine_config");
    const CAR: Field<Car> = Field::new("car");
}
impl Config for CarConfig {
    fn define(def: &mut ConfigDefinition) {
        def.child::<EngineConfig>(Self::ENGINE_CONFIG);
        def.spec("seats", Spec::singleton_list([1_u8, 2, 3, 4]))
            .spec(
                Self::CAR,
                Spec::singleton(build_car)
                    .arg(Ref::to("engine_config.engine"))
                    .kwarg("seats", Ref::to("seats")),
            );
    }
}

fn build_car(args: &Arguments) -> Result<Car, DynError> {
    let engine = args.get::<Engine>(0)?;
    let seats = args.kwarg::<wrapp_spec::List>("seats")?;
    Ok(Car {
        engine,
        seats: seats.len(),
    })
}
