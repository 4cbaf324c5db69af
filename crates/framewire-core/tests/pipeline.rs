use framewire_core::{
    hosted, Component, ComponentError, ComponentRegistry, ComponentState, DataStreamIn,
    DataStreamOut, Hosted, Interface, Pipeline, PipelineConfig, PipelineError, Property,
    PropertyAccess, RegistryError, StreamError,
};
use serde_json::json;

#[derive(Clone, Copy, Debug)]
enum SourceHandler {
    Emit,
}

/// Emits `start`, `start + 1`, ... once per step.
struct Source {
    name: String,
    start: Property<i64>,
    next: i64,
    out: DataStreamOut<i64>,
}

impl Component for Source {
    type Handler = SourceHandler;

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&mut self) -> Vec<&mut dyn PropertyAccess> {
        vec![&mut self.start as &mut dyn PropertyAccess]
    }

    fn prepare_interface(
        &mut self,
        iface: &mut Interface<SourceHandler>,
    ) -> Result<(), ComponentError> {
        iface.register_stream("out", &self.out)?;
        iface.register_handler("emit", SourceHandler::Emit)?;
        iface.add_dependency("emit", None)?;
        Ok(())
    }

    fn on_init(&mut self) -> Result<(), ComponentError> {
        self.next = *self.start;
        Ok(())
    }

    fn handle(&mut self, _: SourceHandler) -> Result<(), ComponentError> {
        self.out.write(self.next);
        self.next += 1;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum SinkHandler {
    Collect,
    Clear,
}

struct Sink {
    name: String,
    input: DataStreamIn<i64>,
    seen: Vec<i64>,
}

impl Component for Sink {
    type Handler = SinkHandler;

    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&mut self) -> Vec<&mut dyn PropertyAccess> {
        Vec::new()
    }

    fn prepare_interface(
        &mut self,
        iface: &mut Interface<SinkHandler>,
    ) -> Result<(), ComponentError> {
        iface.register_stream("in", &self.input)?;
        iface.register_handler("collect", SinkHandler::Collect)?;
        iface.add_dependency("collect", Some("in"))?;
        iface.register_handler("clear", SinkHandler::Clear)?;
        Ok(())
    }

    fn handle(&mut self, handler: SinkHandler) -> Result<(), ComponentError> {
        match handler {
            SinkHandler::Collect => self.seen.extend(self.input.read()),
            SinkHandler::Clear => self.seen.clear(),
        }
        Ok(())
    }
}

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register("Source", |name| {
            hosted(Source {
                name: name.to_string(),
                start: Property::new("start", 0),
                next: 0,
                out: DataStreamOut::new(),
            })
        })
        .unwrap();
    registry
        .register("Sink", |name| {
            hosted(Sink {
                name: name.to_string(),
                input: DataStreamIn::new(),
                seen: Vec::new(),
            })
        })
        .unwrap();
    registry
}

fn config() -> PipelineConfig {
    serde_json::from_value(json!({
        "components": [
            { "name": "src", "type": "Source", "properties": { "start": "10" } },
            { "name": "sink", "type": "Sink" }
        ],
        "connections": [ { "from": "src.out", "to": "sink.in" } ]
    }))
    .unwrap()
}

fn sink_values(pipeline: &Pipeline) -> Vec<i64> {
    pipeline
        .node("sink")
        .unwrap()
        .as_any()
        .downcast_ref::<Hosted<Sink>>()
        .unwrap()
        .component()
        .seen
        .clone()
}

#[test]
fn registry_rejects_duplicates_and_unknown_types() {
    let mut registry = registry();
    assert_eq!(registry.type_names().collect::<Vec<_>>(), vec!["Sink", "Source"]);
    assert_eq!(
        registry.register("Sink", |name| hosted(Sink {
            name: name.to_string(),
            input: DataStreamIn::new(),
            seen: Vec::new(),
        })),
        Err(RegistryError::Duplicate("Sink".into()))
    );
    assert!(matches!(
        registry.create("Camera", "cam"),
        Err(RegistryError::Unknown(_))
    ));
}

#[test]
fn values_flow_from_source_to_sink() {
    let mut pipeline = Pipeline::from_config(&config(), &registry()).unwrap();
    pipeline.init().unwrap();
    pipeline.start().unwrap();

    // Source runs before sink in the same step.
    assert_eq!(pipeline.run(3), 6);
    assert_eq!(sink_values(&pipeline), vec![10, 11, 12]);

    pipeline.invoke("sink", "clear").unwrap();
    assert!(sink_values(&pipeline).is_empty());

    pipeline.stop().unwrap();
    assert_eq!(pipeline.step(), 0);
    pipeline.finish().unwrap();
    assert!(pipeline
        .nodes()
        .all(|n| n.state() == ComponentState::Finished));
}

#[test]
fn wiring_errors_are_reported() {
    let mut cfg = config();
    cfg.connections[0].to = "sink.missing".into();
    assert!(matches!(
        Pipeline::from_config(&cfg, &registry()),
        Err(PipelineError::UnknownStream { .. })
    ));

    cfg.connections[0].to = "sink.in".into();
    cfg.connections[0].from = "sink.in".into();
    assert!(matches!(
        Pipeline::from_config(&cfg, &registry()),
        Err(PipelineError::Connect {
            source: StreamError::Direction { .. },
            ..
        })
    ));

    cfg.connections[0].from = "src".into();
    assert!(matches!(
        Pipeline::from_config(&cfg, &registry()),
        Err(PipelineError::BadEndpoint(_))
    ));
}

#[test]
fn bad_property_values_name_the_component() {
    let mut cfg = config();
    cfg.components[0]
        .properties
        .insert("start".into(), json!("ten"));
    let err = Pipeline::from_config(&cfg, &registry()).err().unwrap();
    assert!(matches!(err, PipelineError::Component { ref component, .. } if component == "src"));
    assert!(err.to_string().contains("start"));
}

#[test]
fn duplicate_instance_names_are_rejected() {
    let mut cfg = config();
    cfg.components[1].name = "src".into();
    cfg.connections.clear();
    assert!(matches!(
        Pipeline::from_config(&cfg, &registry()),
        Err(PipelineError::DuplicateComponent(_))
    ));
}

#[test]
fn config_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let cfg = config();
    cfg.write_json(&path).unwrap();
    assert_eq!(PipelineConfig::load_json(&path).unwrap(), cfg);
}
