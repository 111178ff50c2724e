/// Implements [`Event`](crate::Event) for a struct holding a `notifier: NotifierSlot` field.
///
/// Event families the type belongs to may follow a colon.
///
/// # Example
///
/// ```rust,ignore
/// pub struct ChatMessage {
///     pub text: String,
///     notifier: NotifierSlot,
/// }
///
/// pub trait ChatTraffic {}
///
/// event!(ChatMessage: dyn ChatTraffic);
/// ```
#[macro_export]
macro_rules! event {
    ($ty:ty $(: $($family:ty),+ $(,)?)?) => {
        impl $crate::Event for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn notifier_slot(&self) -> &$crate::NotifierSlot {
                &self.notifier
            }

            $(
                fn supertypes() -> ::std::vec::Vec<$crate::TypeKey> {
                    ::std::vec![$($crate::TypeKey::of::<$family>()),+]
                }
            )?
        }
    };
}

/// Implements [`Contract`](crate::Contract) for a capability trait object, building
/// its descriptor once and caching it for the life of the process.
///
/// The identifier before `=>` names the fresh
/// [`CapabilityBuilder`](crate::CapabilityBuilder) inside the expression.
///
/// # Example
///
/// ```rust,ignore
/// pub trait Greeter: Send + Sync {
///     fn on_greeting(&self, event: &GreetingEvent) -> anyhow::Result<()>;
/// }
///
/// contract!(dyn Greeter, builder => builder
///     .handler("on_greeting", |g, e: &GreetingEvent| g.on_greeting(e)));
/// ```
#[macro_export]
macro_rules! contract {
    ($cap:ty, $builder:ident => $body:expr $(,)?) => {
        impl $crate::Contract for $cap {
            fn capability() -> ::std::sync::Arc<$crate::Capability> {
                static CAPABILITY: ::std::sync::LazyLock<::std::sync::Arc<$crate::Capability>> =
                    ::std::sync::LazyLock::new(|| {
                        let $builder = $crate::CapabilityBuilder::<$cap>::contract();
                        ($body).build()
                    });
                ::std::sync::Arc::clone(&CAPABILITY)
            }
        }
    };
}

/// Implements [`Listener`](crate::Listener) for a type, declaring the capabilities
/// it implements.
///
/// # Example
///
/// ```rust,ignore
/// listener!(ConsoleGreeter: dyn Greeter, dyn Farewell);
/// ```
#[macro_export]
macro_rules! listener {
    ($ty:ty : $($cap:ty),+ $(,)?) => {
        impl $crate::Listener for $ty {
            fn contracts(
                this: &::std::sync::Arc<Self>,
                contracts: &mut $crate::Contracts,
            ) {
                $({
                    let view: ::std::sync::Arc<$cap> = ::std::sync::Arc::<Self>::clone(this);
                    contracts.implement::<$cap>(view);
                })+
            }
        }
    };
}
