//! Schema descriptors for state records.
//!
//! A state record is a plain struct whose fields are listed once, at compile
//! time, through [`State::describe`]. The [`state!`](crate::state!) macro
//! writes that impl together with one [`Field`] descriptor per field, so
//! accessors are generated from the schema instead of from runtime key
//! enumeration.

use std::fmt;

/// Values that can live in a state field.
///
/// Equality is used by setters to skip writes that would not change
/// anything. It is the field type's own `PartialEq`, so nested values compare
/// however their type says they do.
pub trait Value: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Typed handle to one field of a state record.
pub struct Field<S, V> {
    name: &'static str,
    get: fn(&S) -> &V,
    get_mut: fn(&mut S) -> &mut V,
}

impl<S, V> Field<S, V> {
    pub const fn new(name: &'static str, get: fn(&S) -> &V, get_mut: fn(&mut S) -> &mut V) -> Self {
        Self { name, get, get_mut }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<'a>(&self, state: &'a S) -> &'a V {
        (self.get)(state)
    }

    pub fn get_mut<'a>(&self, state: &'a mut S) -> &'a mut V {
        (self.get_mut)(state)
    }
}

impl<S, V> Clone for Field<S, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, V> Copy for Field<S, V> {}

impl<S, V> fmt::Debug for Field<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

/// Receives every field of a state record, in declaration order.
pub trait FieldVisitor<S> {
    fn visit<V: Value>(&mut self, field: Field<S, V>);
}

/// A flat state record with a fixed set of keys.
pub trait State: Clone + Send + Sync + 'static {
    fn describe<F: FieldVisitor<Self>>(visitor: &mut F);

    /// Field names in declaration order.
    fn keys() -> Vec<&'static str> {
        struct Keys(Vec<&'static str>);

        impl<S> FieldVisitor<S> for Keys {
            fn visit<V: Value>(&mut self, field: Field<S, V>) {
                self.0.push(field.name());
            }
        }

        let mut keys = Keys(Vec::new());
        Self::describe(&mut keys);
        keys.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::state! {
        #[derive(Clone, Debug, PartialEq)]
        struct Person {
            first_name: String,
            age: u32,
        }
    }

    #[test]
    fn keys_follow_declaration_order() {
        assert_eq!(Person::keys(), vec!["first_name", "age"]);
    }

    #[test]
    fn field_descriptors_project() {
        let mut person = Person {
            first_name: "Ada".to_string(),
            age: 36,
        };
        let age = Person::age();

        assert_eq!(age.name(), "age");
        assert_eq!(*age.get(&person), 36);
        *age.get_mut(&mut person) += 1;
        assert_eq!(person.age, 37);
        assert_eq!(
            format!("{:?}", Person::first_name()),
            "Field(\"first_name\")"
        );
    }
}
