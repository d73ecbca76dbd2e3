use crate::context::MiddlewareContext;
use crate::middleware::MiddlewareOutcome;

/// A middleware that can be built from a statically-known configuration type,
/// for use in a compile-time-assembled chain (spec.md §4.4 realization (b), §9
/// "Comptime middleware chain: realize as generic composition").
///
/// Unlike `Middleware`, this is not trait-object-safe — `Config` is an associated
/// type, which is the point: the static chain's component list is a type list known
/// at compile time, so each component can be monomorphized rather than dispatched
/// through a vtable.
pub trait StaticMiddleware: Send + Sync + 'static {
    type Config;

    fn build(config: Self::Config) -> Self;

    fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome;
}

macro_rules! continue_or_return {
    ($expr:expr) => {
        match $expr {
            MiddlewareOutcome::Continue => {}
            short_circuit @ MiddlewareOutcome::ShortCircuit(_) => return short_circuit,
        }
    };
}

macro_rules! impl_static_chain {
    ($name:ident, $($t:ident : $f:ident),+) => {
        /// A compile-time-assembled middleware chain over
        #[doc = stringify!($($t),+)]
        /// . Construct with `
        #[doc = stringify!($name)]
        /// ::new((cfg1, cfg2, ...))`; `process` runs each component in type-list order
        /// and is monomorphized — no dynamic dispatch anywhere in the chain.
        pub struct $name<$($t: StaticMiddleware),+> {
            $($f: $t),+
        }

        impl<$($t: StaticMiddleware),+> $name<$($t),+> {
            pub fn new(configs: ($($t::Config),+,)) -> Self {
                #[allow(non_snake_case)]
                let ($($t),+,) = configs;
                $name { $($f: <$t as StaticMiddleware>::build($t)),+ }
            }

            pub fn process(&self, ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
                $(continue_or_return!(self.$f.process(ctx));)+
                MiddlewareOutcome::Continue
            }
        }
    };
}

impl_static_chain!(StaticChain1, A: a);
impl_static_chain!(StaticChain2, A: a, B: b);
impl_static_chain!(StaticChain3, A: a, B: b, C: c);
impl_static_chain!(StaticChain4, A: a, B: b, C: c, D: d);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RouteView;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    struct Allow;
    impl StaticMiddleware for Allow {
        type Config = ();
        fn build(_config: ()) -> Self {
            Allow
        }
        fn process(&self, _ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
            MiddlewareOutcome::Continue
        }
    }

    struct DenyAbove {
        limit: u16,
    }
    impl StaticMiddleware for DenyAbove {
        type Config = u16;
        fn build(limit: u16) -> Self {
            DenyAbove { limit }
        }
        fn process(&self, _ctx: &mut MiddlewareContext<'_>) -> MiddlewareOutcome {
            if self.limit == 0 {
                MiddlewareOutcome::deny(429, "Rate limit exceeded")
            } else {
                MiddlewareOutcome::Continue
            }
        }
    }

    #[test]
    fn two_component_chain_short_circuits_on_second() {
        let chain = StaticChain2::<Allow, DenyAbove>::new(((), 0));
        let mut route = RouteView { upstream: "http://u".into() };
        let headers = HashMap::new();
        let mut ctx = MiddlewareContext::new(
            "GET",
            "/x",
            &headers,
            "127.0.0.1:1".parse::<SocketAddr>().unwrap(),
            None,
            &mut route,
            HashMap::new(),
        );
        match chain.process(&mut ctx) {
            MiddlewareOutcome::ShortCircuit(resp) => assert_eq!(resp.status_code, 429),
            MiddlewareOutcome::Continue => panic!("expected deny"),
        }
    }

    #[test]
    fn all_allow_chain_continues() {
        let chain = StaticChain3::<Allow, Allow, Allow>::new(((), (), ()));
        let mut route = RouteView { upstream: "http://u".into() };
        let headers = HashMap::new();
        let mut ctx = MiddlewareContext::new(
            "GET",
            "/x",
            &headers,
            "127.0.0.1:1".parse::<SocketAddr>().unwrap(),
            None,
            &mut route,
            HashMap::new(),
        );
        assert!(matches!(chain.process(&mut ctx), MiddlewareOutcome::Continue));
    }
}
