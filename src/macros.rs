/// Declare a state record.
///
/// Emits the struct unchanged, an associated function per field returning
/// its [`Field`](crate::Field) descriptor, and the [`State`](crate::State)
/// impl listing every field.
///
/// # Usage
///
/// ```rust
/// use tincan_utils::{create, state, State};
///
/// state! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Counter {
///         pub count: i32,
///     }
/// }
///
/// assert_eq!(Counter::keys(), vec!["count"]);
///
/// let api = create(Counter { count: 1 });
/// api.set().field(Counter::count(), 2);
/// assert_eq!(api.get().field(Counter::count()), 2);
/// ```
#[macro_export]
macro_rules! state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        #[allow(dead_code)]
        impl $name {
            $(
                $vis fn $field() -> $crate::Field<$name, $ty> {
                    fn get(state: &$name) -> &$ty {
                        &state.$field
                    }
                    fn get_mut(state: &mut $name) -> &mut $ty {
                        &mut state.$field
                    }
                    $crate::Field::new(stringify!($field), get, get_mut)
                }
            )*
        }

        impl $crate::State for $name {
            fn describe<F: $crate::FieldVisitor<Self>>(visitor: &mut F) {
                $( visitor.visit($name::$field()); )*
            }
        }
    };
}
