#[cfg(test)]
pub mod test {
    use crate::builder::ConfigBuilder;
    use crate::config::Config;
    use crate::constraint::Constraint;
    use crate::key::Key;
    use crate::marshal::{ConfigEnum, ConfigSerializableObject, ConfigTypeWrapper, Wrapped};
    use crate::metadata::MetadataMap;
    use crate::tracked::{ErasedValue, TrackedValue, ValueHandle};
    use crate::values::ValueList;

    // -- Enum fixture -----------------------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Mode {
        Fast,
        Slow,
    }

    impl ConfigEnum for Mode {
        const VARIANTS: &'static [Self] = &[Mode::Fast, Mode::Slow];

        fn name(&self) -> &'static str {
            match self {
                Mode::Fast => "Fast",
                Mode::Slow => "Slow",
            }
        }
    }

    // -- Serializable object fixture --------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Port(u16);

    impl Port {
        pub fn new(number: u16) -> Self {
            Port(number)
        }

        pub fn number(&self) -> u16 {
            self.0
        }
    }

    impl ConfigSerializableObject for Port {
        type Representation = u16;

        fn representation(&self) -> u16 {
            self.0
        }

        fn convert_from(&self, representation: u16) -> Self {
            Port(representation)
        }
    }

    // -- Type wrapper fixture ---------------------------------------------------

    /// A foreign-looking type stored as `#rrggbb`.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Rgb(pub u8, pub u8, pub u8);

    pub struct RgbWrapper;

    impl ConfigTypeWrapper<Rgb> for RgbWrapper {
        type Representation = String;

        fn representation(&self, value: &Rgb) -> String {
            format!("#{:02x}{:02x}{:02x}", value.0, value.1, value.2)
        }

        fn convert_from(&self, representation: String) -> Rgb {
            let hex = representation.trim_start_matches('#');
            let channel = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
                    .unwrap_or(0)
            };
            Rgb(channel(0), channel(2), channel(4))
        }
    }

    /// A bare `i32` value, for tests that only care about keys and metadata.
    pub fn untyped(key: Key, metadata: MetadataMap) -> Box<dyn ErasedValue> {
        Box::new(TrackedValue::new(key, 0i32, Vec::new(), Vec::new(), metadata).unwrap())
    }

    // -- Sample config ----------------------------------------------------------

    /// Handles into the config built by [`sample_builder`].
    #[derive(Debug, Clone, Copy)]
    pub struct Sample {
        pub name: ValueHandle<String>,
        pub port: ValueHandle<u16>,
        pub george: ValueHandle<i64>,
        pub mode: ValueHandle<Mode>,
        pub tags: ValueHandle<ValueList<String>>,
        pub scale: ValueHandle<f64>,
        pub accent: ValueHandle<Wrapped<Rgb>>,
    }

    fn non_empty() -> Constraint<String> {
        Constraint::new("non-empty", |s: &String| {
            s.is_empty().then(|| "must not be empty".to_string())
        })
    }

    /// Family `sample`, id `client`:
    ///
    /// ```text
    /// name = "localhost"
    /// port = 8080            # range 1..=65535
    /// george = 0             # alias "johnson"
    /// mode = "Fast"
    /// tags = ["alpha", "beta"]
    /// [gui]                  # "Display settings"
    /// scale = 1.0            # range 0.5..=4.0
    /// accent = "#000000"     # Rgb through RgbWrapper
    /// ```
    pub fn sample_builder() -> (ConfigBuilder, Sample) {
        let mut builder = ConfigBuilder::new("sample", "client").type_wrapper::<Rgb, _>(RgbWrapper);

        let name = builder
            .value("name", TrackedValue::builder("localhost".to_string()))
            .unwrap();
        let port = builder
            .value(
                "port",
                TrackedValue::builder(8080u16).constraint(Constraint::range(1, 65535)),
            )
            .unwrap();
        let george = builder
            .value("george", TrackedValue::builder(0i64).alias("johnson"))
            .unwrap();
        let mode = builder
            .value("mode", TrackedValue::builder(Mode::Fast))
            .unwrap();
        let tags = builder
            .value(
                "tags",
                TrackedValue::builder(ValueList::of(
                    String::new(),
                    ["alpha".to_string(), "beta".to_string()],
                ))
                .constraint(Constraint::all(non_empty())),
            )
            .unwrap();
        let (scale, accent) = builder
            .section("gui", |gui| {
                gui.comment("Display settings");
                let scale = gui.value(
                    "scale",
                    TrackedValue::builder(1.0f64).constraint(Constraint::range(0.5, 4.0)),
                )?;
                let accent = gui.value("accent", TrackedValue::builder(Wrapped(Rgb(0, 0, 0))))?;
                Ok((scale, accent))
            })
            .unwrap();

        let handles = Sample {
            name,
            port,
            george,
            mode,
            tags,
            scale,
            accent,
        };
        (builder, handles)
    }

    pub fn sample() -> (Config, Sample) {
        let (builder, handles) = sample_builder();
        (builder.build().unwrap(), handles)
    }

    #[test]
    fn sample_builds_with_defaults() {
        let (config, h) = sample();
        assert_eq!(config.value(&h.name).unwrap(), "localhost");
        assert_eq!(config.value(&h.tags).unwrap().len(), 2);
        assert_eq!(config.value(&h.accent).unwrap().0, Rgb(0, 0, 0));
    }

    #[test]
    fn rgb_wrapper_falls_back_on_bad_input() {
        assert_eq!(RgbWrapper.convert_from("#10ff00".into()), Rgb(0x10, 0xff, 0x00));
        assert_eq!(RgbWrapper.convert_from("nope".into()), Rgb(0, 0, 0));
    }
}
