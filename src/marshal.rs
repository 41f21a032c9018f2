//! Conversion between [`Fragment`]s and typed values.
//!
//! Every tracked value's type implements [`ConfigValue`]. Coercion is driven by
//! a *template*, normally the value's default: the template fixes the shape
//! (element defaults for compounds, representation for objects and wrapped
//! values) and the fragment supplies the data.
//!
//! Supported shapes:
//!
//! - integers `i8..=i64`, `u8..=u64`, `usize`; floats `f32`, `f64`. Integer
//!   fragments narrow with overflow checks, float fragments truncate toward
//!   zero into integer types.
//! - `bool` and `String`, which accept only their own fragment kind.
//! - any [`ConfigEnum`], matched case-insensitively by variant name.
//! - [`Object<T>`] for types that convert to and from a representation.
//! - [`Wrapped<V>`] for foreign types handled by a runtime [`ConfigTypeWrapper`].
//! - [`ValueList`](crate::values::ValueList) and
//!   [`ValueMap`](crate::values::ValueMap), see [`values`](crate::values).

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::CoercionError;
use crate::fragment::Fragment;

/// A type that can be held by a tracked value.
pub trait ConfigValue: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Convert `fragment` into the shape of `template`.
    fn coerce(
        fragment: &Fragment,
        template: &Self,
        wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError>;

    fn to_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError>;

    /// Whether this value can be marshalled at all with `wrappers`.
    fn check_supported(&self, _wrappers: &TypeWrappers) -> Result<(), CoercionError> {
        Ok(())
    }

    /// Accepted constant names, for enum-shaped values.
    fn enum_options(&self) -> Option<Vec<&'static str>> {
        None
    }

    fn is_compound(&self) -> bool {
        false
    }
}

pub(crate) fn mismatch(expected: &'static str, found: &Fragment) -> CoercionError {
    CoercionError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

macro_rules! int_value {
    ($($t:ty),* $(,)?) => {$(
        impl ConfigValue for $t {
            fn coerce(
                fragment: &Fragment,
                _template: &Self,
                _wrappers: &TypeWrappers,
            ) -> Result<Self, CoercionError> {
                match fragment {
                    Fragment::Int(i) => <$t>::try_from(*i).map_err(|_| {
                        CoercionError::NumericOverflow {
                            value: i.to_string(),
                            target: stringify!($t),
                        }
                    }),
                    // Truncates toward zero. `as i128` saturates, so anything past
                    // the i128 range still fails the range check below.
                    Fragment::Float(x) if x.is_finite() => {
                        <$t>::try_from(x.trunc() as i128).map_err(|_| {
                            CoercionError::NumericOverflow {
                                value: x.to_string(),
                                target: stringify!($t),
                            }
                        })
                    }
                    Fragment::Float(x) => Err(CoercionError::NumericOverflow {
                        value: x.to_string(),
                        target: stringify!($t),
                    }),
                    other => Err(mismatch("number", other)),
                }
            }

            fn to_fragment(&self, _wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
                i64::try_from(*self)
                    .map(Fragment::Int)
                    .map_err(|_| CoercionError::NumericOverflow {
                        value: self.to_string(),
                        target: "i64",
                    })
            }
        }
    )*};
}

int_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! float_value {
    ($($t:ty),* $(,)?) => {$(
        impl ConfigValue for $t {
            fn coerce(
                fragment: &Fragment,
                _template: &Self,
                _wrappers: &TypeWrappers,
            ) -> Result<Self, CoercionError> {
                match fragment {
                    Fragment::Int(i) => Ok(*i as $t),
                    Fragment::Float(x) => Ok(*x as $t),
                    other => Err(mismatch("number", other)),
                }
            }

            fn to_fragment(&self, _wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
                Ok(Fragment::Float(f64::from(*self)))
            }
        }
    )*};
}

float_value!(f32, f64);

impl ConfigValue for bool {
    fn coerce(
        fragment: &Fragment,
        _template: &Self,
        _wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        match fragment {
            Fragment::Bool(b) => Ok(*b),
            other => Err(mismatch("boolean", other)),
        }
    }

    fn to_fragment(&self, _wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        Ok(Fragment::Bool(*self))
    }
}

impl ConfigValue for String {
    fn coerce(
        fragment: &Fragment,
        _template: &Self,
        _wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        match fragment {
            Fragment::String(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }

    fn to_fragment(&self, _wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        Ok(Fragment::String(self.clone()))
    }
}

/// A fieldless enum usable as a config value.
///
/// ```
/// use trackfig::ConfigEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Mode { Fast, Slow }
///
/// impl ConfigEnum for Mode {
///     const VARIANTS: &'static [Self] = &[Mode::Fast, Mode::Slow];
///     fn name(&self) -> &'static str {
///         match self {
///             Mode::Fast => "Fast",
///             Mode::Slow => "Slow",
///         }
///     }
/// }
/// ```
pub trait ConfigEnum: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    const VARIANTS: &'static [Self];

    /// The constant name written to documents.
    fn name(&self) -> &'static str;
}

impl<T: ConfigEnum> ConfigValue for T {
    fn coerce(
        fragment: &Fragment,
        _template: &Self,
        _wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        let Fragment::String(s) = fragment else {
            return Err(mismatch("string", fragment));
        };
        T::VARIANTS
            .iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| CoercionError::UnknownEnumConstant {
                value: s.clone(),
                enum_type: short_type_name::<T>(),
            })
    }

    fn to_fragment(&self, _wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        Ok(Fragment::String(self.name().to_string()))
    }

    fn enum_options(&self) -> Option<Vec<&'static str>> {
        Some(T::VARIANTS.iter().map(ConfigEnum::name).collect())
    }
}

/// `type_name` without the module path.
fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// A value stored through an intermediate representation it owns the
/// conversion for.
///
/// `convert_from` is called on the template, so the conversion may depend on
/// the default's own state.
pub trait ConfigSerializableObject: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    type Representation: ConfigValue;

    fn representation(&self) -> Self::Representation;

    fn convert_from(&self, representation: Self::Representation) -> Self;
}

/// Marshals `T` through [`ConfigSerializableObject`].
#[derive(Debug, Clone, PartialEq)]
pub struct Object<T>(pub T);

impl<T> Deref for Object<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ConfigSerializableObject> ConfigValue for Object<T> {
    fn coerce(
        fragment: &Fragment,
        template: &Self,
        wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        let repr_template = template.0.representation();
        let repr = T::Representation::coerce(fragment, &repr_template, wrappers)?;
        Ok(Object(template.0.convert_from(repr)))
    }

    fn to_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        self.0.representation().to_fragment(wrappers)
    }

    fn check_supported(&self, wrappers: &TypeWrappers) -> Result<(), CoercionError> {
        self.0.representation().check_supported(wrappers)
    }

    fn enum_options(&self) -> Option<Vec<&'static str>> {
        self.0.representation().enum_options()
    }

    fn is_compound(&self) -> bool {
        self.0.representation().is_compound()
    }
}

/// Runtime-registered conversion for a type that cannot implement
/// [`ConfigValue`] itself.
pub trait ConfigTypeWrapper<V>: Send + Sync + 'static {
    type Representation: ConfigValue;

    fn representation(&self, value: &V) -> Self::Representation;

    fn convert_from(&self, representation: Self::Representation) -> V;
}

trait ErasedWrapper: Send + Sync {
    fn coerce(
        &self,
        fragment: &Fragment,
        template: &dyn Any,
        wrappers: &TypeWrappers,
    ) -> Result<Box<dyn Any>, CoercionError>;

    fn to_fragment(
        &self,
        value: &dyn Any,
        wrappers: &TypeWrappers,
    ) -> Result<Fragment, CoercionError>;
}

struct Adapter<W, V> {
    wrapper: W,
    _marker: PhantomData<fn() -> V>,
}

impl<W, V> ErasedWrapper for Adapter<W, V>
where
    W: ConfigTypeWrapper<V>,
    V: 'static,
{
    fn coerce(
        &self,
        fragment: &Fragment,
        template: &dyn Any,
        wrappers: &TypeWrappers,
    ) -> Result<Box<dyn Any>, CoercionError> {
        let template = template
            .downcast_ref::<V>()
            .ok_or_else(unsupported::<V>)?;
        let repr_template = self.wrapper.representation(template);
        let repr = W::Representation::coerce(fragment, &repr_template, wrappers)?;
        Ok(Box::new(self.wrapper.convert_from(repr)))
    }

    fn to_fragment(
        &self,
        value: &dyn Any,
        wrappers: &TypeWrappers,
    ) -> Result<Fragment, CoercionError> {
        let value = value.downcast_ref::<V>().ok_or_else(unsupported::<V>)?;
        self.wrapper.representation(value).to_fragment(wrappers)
    }
}

fn unsupported<V>() -> CoercionError {
    CoercionError::UnsupportedType {
        type_name: type_name::<V>(),
    }
}

/// Registry of [`ConfigTypeWrapper`]s, keyed by the wrapped type.
#[derive(Clone, Default)]
pub struct TypeWrappers {
    wrappers: HashMap<TypeId, Arc<dyn ErasedWrapper>>,
}

impl TypeWrappers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `wrapper` for `V`, replacing any earlier one.
    pub fn register<V, W>(&mut self, wrapper: W)
    where
        V: 'static,
        W: ConfigTypeWrapper<V>,
    {
        let adapter = Adapter {
            wrapper,
            _marker: PhantomData::<fn() -> V>,
        };
        self.wrappers.insert(TypeId::of::<V>(), Arc::new(adapter));
    }

    pub fn contains<V: 'static>(&self) -> bool {
        self.wrappers.contains_key(&TypeId::of::<V>())
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    fn get<V: 'static>(&self) -> Result<&dyn ErasedWrapper, CoercionError> {
        self.wrappers
            .get(&TypeId::of::<V>())
            .map(|w| &**w)
            .ok_or_else(unsupported::<V>)
    }
}

impl fmt::Debug for TypeWrappers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeWrappers")
            .field("len", &self.wrappers.len())
            .finish()
    }
}

/// Marshals `V` through the [`ConfigTypeWrapper`] registered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapped<V>(pub V);

impl<V> Deref for Wrapped<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.0
    }
}

impl<V> ConfigValue for Wrapped<V>
where
    V: Clone + fmt::Debug + PartialEq + Send + Sync + 'static,
{
    fn coerce(
        fragment: &Fragment,
        template: &Self,
        wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        let wrapper = wrappers.get::<V>()?;
        let value = wrapper.coerce(fragment, &template.0, wrappers)?;
        value
            .downcast::<V>()
            .map(|v| Wrapped(*v))
            .map_err(|_| unsupported::<V>())
    }

    fn to_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        wrappers.get::<V>()?.to_fragment(&self.0, wrappers)
    }

    fn check_supported(&self, wrappers: &TypeWrappers) -> Result<(), CoercionError> {
        wrappers.get::<V>().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Mode, Port, Rgb, RgbWrapper};

    fn none() -> TypeWrappers {
        TypeWrappers::new()
    }

    #[test]
    fn integer_narrowing_is_checked() {
        assert_eq!(u8::coerce(&Fragment::Int(200), &0, &none()), Ok(200));
        assert_eq!(
            u8::coerce(&Fragment::Int(300), &0, &none()),
            Err(CoercionError::NumericOverflow {
                value: "300".into(),
                target: "u8",
            })
        );
        assert!(u32::coerce(&Fragment::Int(-1), &0, &none()).is_err());
    }

    #[test]
    fn float_truncates_into_integer() {
        assert_eq!(i32::coerce(&Fragment::Float(2.9), &0, &none()), Ok(2));
        assert_eq!(i32::coerce(&Fragment::Float(-2.9), &0, &none()), Ok(-2));
    }

    #[test]
    fn float_out_of_integer_range_is_rejected() {
        assert!(matches!(
            u8::coerce(&Fragment::Float(300.0), &0, &none()),
            Err(CoercionError::NumericOverflow { target: "u8", .. })
        ));
        assert!(matches!(
            u32::coerce(&Fragment::Float(-1.5), &0, &none()),
            Err(CoercionError::NumericOverflow { target: "u32", .. })
        ));
        assert!(matches!(
            i64::coerce(&Fragment::Float(1e30), &0, &none()),
            Err(CoercionError::NumericOverflow { .. })
        ));
        assert_eq!(u8::coerce(&Fragment::Float(255.9), &0, &none()), Ok(255));
    }

    #[test]
    fn non_finite_float_is_not_an_integer() {
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                i32::coerce(&Fragment::Float(x), &0, &none()),
                Err(CoercionError::NumericOverflow { target: "i32", .. })
            ));
        }
    }

    #[test]
    fn integer_widens_into_float() {
        assert_eq!(f64::coerce(&Fragment::Int(3), &0.0, &none()), Ok(3.0));
        assert_eq!(f32::coerce(&Fragment::Float(0.5), &0.0, &none()), Ok(0.5));
    }

    #[test]
    fn wrong_kind_is_a_mismatch() {
        assert_eq!(
            i64::coerce(&Fragment::from("x"), &0, &none()),
            Err(CoercionError::TypeMismatch {
                expected: "number",
                found: "string",
            })
        );
        assert!(bool::coerce(&Fragment::Int(1), &false, &none()).is_err());
        assert!(String::coerce(&Fragment::Bool(true), &String::new(), &none()).is_err());
    }

    #[test]
    fn large_unsigned_does_not_fit_a_fragment() {
        assert!(u64::MAX.to_fragment(&none()).is_err());
        assert_eq!(42u64.to_fragment(&none()), Ok(Fragment::Int(42)));
    }

    #[test]
    fn enum_matches_case_insensitively() {
        assert_eq!(Mode::coerce(&Fragment::from("slow"), &Mode::Fast, &none()), Ok(Mode::Slow));
        assert_eq!(Mode::coerce(&Fragment::from("FAST"), &Mode::Slow, &none()), Ok(Mode::Fast));
        assert_eq!(Mode::Slow.to_fragment(&none()), Ok(Fragment::from("Slow")));
    }

    #[test]
    fn unknown_enum_constant_names_the_type() {
        let err = Mode::coerce(&Fragment::from("turbo"), &Mode::Fast, &none()).unwrap_err();
        assert_eq!(
            err,
            CoercionError::UnknownEnumConstant {
                value: "turbo".into(),
                enum_type: "Mode",
            }
        );
    }

    #[test]
    fn enum_lists_options() {
        assert_eq!(Mode::Fast.enum_options(), Some(vec!["Fast", "Slow"]));
        assert_eq!(5i32.enum_options(), None);
    }

    #[test]
    fn object_goes_through_representation() {
        let template = Object(Port::new(8080));
        let value = Object::coerce(&Fragment::Int(9000), &template, &none()).unwrap();
        assert_eq!(value.number(), 9000);
        assert_eq!(value.to_fragment(&none()), Ok(Fragment::Int(9000)));
    }

    #[test]
    fn wrapped_without_wrapper_is_unsupported() {
        let template = Wrapped(Rgb(0, 0, 0));
        let err = template.check_supported(&none()).unwrap_err();
        assert!(matches!(err, CoercionError::UnsupportedType { type_name } if type_name.ends_with("Rgb")));
        assert!(Wrapped::coerce(&Fragment::from("#ffffff"), &template, &none()).is_err());
    }

    #[test]
    fn wrapped_uses_registered_wrapper() {
        let mut wrappers = TypeWrappers::new();
        wrappers.register::<Rgb, _>(RgbWrapper);
        let template = Wrapped(Rgb(0, 0, 0));
        assert!(template.check_supported(&wrappers).is_ok());

        let value = Wrapped::coerce(&Fragment::from("#10ff00"), &template, &wrappers).unwrap();
        assert_eq!(*value, Rgb(0x10, 0xff, 0x00));
        assert_eq!(value.to_fragment(&wrappers), Ok(Fragment::from("#10ff00")));
    }
}
