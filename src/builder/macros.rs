//! Macros for ergonomic state machine construction.

/// Declare a state machine shape.
///
/// Each line names a state and the values it may move to. An optional
/// `hooks:` bundle is shared by every state. Expands to
/// `Result<Arc<StateMachine>>`.
///
/// # Example
///
/// ```
/// use cascade::state_machine;
///
/// let machine = state_machine! {
///     Solid => [Liquid],
///     Liquid => [Gas, Solid],
///     Gas => [Liquid],
/// }
/// .unwrap();
///
/// let liquid = machine.find("Liquid").unwrap();
/// assert!(machine[liquid].permits("Gas"));
/// ```
#[macro_export]
macro_rules! state_machine {
    (hooks: $hooks:expr; $($rest:tt)*) => {
        $crate::state_machine!(
            @build ::std::option::Option::Some(
                ::std::sync::Arc::new($hooks) as ::std::sync::Arc<dyn $crate::core::Hooks>
            );
            $($rest)*
        )
    };
    (
        @build $shared:expr;
        $(
            $state:ident => [$($next:ident),* $(,)?]
        ),* $(,)?
    ) => {{
        let shared: ::std::option::Option<::std::sync::Arc<dyn $crate::core::Hooks>> = $shared;
        let builder = $crate::builder::StateMachineBuilder::new();
        $(
            let state = $crate::builder::StateBuilder::new(stringify!($state))
                $(.permit(stringify!($next)))*;
            let state = match &shared {
                ::std::option::Option::Some(hooks) => {
                    state.shared_hooks(::std::sync::Arc::clone(hooks))
                }
                ::std::option::Option::None => state,
            };
            let builder = builder.state(state);
        )*
        builder.build()
    }};
    ($($rest:tt)*) => {
        $crate::state_machine!(@build ::std::option::Option::None; $($rest)*)
    };
}
