/// A payload that may be carried by a message of type `M`.
pub trait Variant<M>: Sized {
    /// Takes the payload out of `message`, or hands the message back
    /// untouched if it carries something else.
    fn extract(message: M) -> Result<Self, M>;
}

type Route<S, M, E> = Box<dyn Fn(&mut S, M) -> Result<Result<(), E>, M>>;

/// Routes messages to handlers by payload type.
///
/// Routes are tried in registration order and the first one whose payload
/// matches consumes the message. Messages nobody claims reach the fallback,
/// which by default reports them as unhandled.
pub struct Dispatcher<S, M, E> {
    routes: Vec<Route<S, M, E>>,
    fallback: fn(&mut S, M) -> Result<bool, E>,
}

impl<S, M, E> Dispatcher<S, M, E> {
    pub fn new() -> Self {
        Dispatcher {
            routes: Vec::new(),
            fallback: |_, _| Ok(false),
        }
    }

    pub fn on<P>(mut self, handler: fn(&mut S, P) -> Result<(), E>) -> Self
    where
        P: Variant<M> + 'static,
        S: 'static,
        M: 'static,
        E: 'static,
    {
        self.routes.push(Box::new(move |state, message| {
            P::extract(message).map(|payload| handler(state, payload))
        }));
        self
    }

    /// Replaces the handler for messages no route claims. It returns whether
    /// it handled the message.
    pub fn otherwise(mut self, fallback: fn(&mut S, M) -> Result<bool, E>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Returns `Ok(false)` when the message went unhandled.
    pub fn dispatch(&self, state: &mut S, message: M) -> Result<bool, E> {
        let mut message = message;
        for route in &self.routes {
            match route(state, message) {
                Ok(handled) => return handled.map(|()| true),
                Err(unclaimed) => message = unclaimed,
            }
        }
        (self.fallback)(state, message)
    }
}

impl<S, M, E> Default for Dispatcher<S, M, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Shape {
        Circle(u32),
        Square(u8),
        Point,
    }

    struct Circle(u32);
    struct Square(u8);

    impl Variant<Shape> for Circle {
        fn extract(message: Shape) -> Result<Self, Shape> {
            match message {
                Shape::Circle(r) => Ok(Circle(r)),
                other => Err(other),
            }
        }
    }

    impl Variant<Shape> for Square {
        fn extract(message: Shape) -> Result<Self, Shape> {
            match message {
                Shape::Square(s) => Ok(Square(s)),
                other => Err(other),
            }
        }
    }

    #[derive(Default)]
    struct Log(Vec<String>);

    fn circle(log: &mut Log, Circle(r): Circle) -> Result<(), String> {
        log.0.push(format!("circle {r}"));
        Ok(())
    }

    fn circle_again(log: &mut Log, _: Circle) -> Result<(), String> {
        log.0.push("second".to_string());
        Ok(())
    }

    fn square(_: &mut Log, Square(s): Square) -> Result<(), String> {
        Err(format!("square {s}"))
    }

    #[test]
    fn first_matching_route_wins() {
        let dispatcher = Dispatcher::new().on(circle).on(circle_again);
        let mut log = Log::default();

        assert_eq!(dispatcher.dispatch(&mut log, Shape::Circle(3)), Ok(true));
        assert_eq!(log.0, ["circle 3"]);
    }

    #[test]
    fn handler_errors_propagate() {
        let dispatcher = Dispatcher::new().on(circle).on(square);
        let mut log = Log::default();

        assert_eq!(
            dispatcher.dispatch(&mut log, Shape::Square(2)),
            Err("square 2".to_string())
        );
    }

    #[test]
    fn unclaimed_messages_reach_fallback() {
        let mut log = Log::default();

        let dispatcher = Dispatcher::new().on(circle);
        assert_eq!(dispatcher.dispatch(&mut log, Shape::Point), Ok(false));

        let dispatcher = dispatcher.otherwise(|log: &mut Log, shape| {
            log.0.push(format!("fallback {shape:?}"));
            Ok(true)
        });
        assert_eq!(dispatcher.dispatch(&mut log, Shape::Point), Ok(true));
        assert_eq!(log.0, ["fallback Point"]);
    }
}
