//! Key handler capability used by the capture engine.

/// Receives the filtered key events of a running capture.
///
/// Both methods are called on the capture thread, in delivery order. The
/// returned flag is reserved for suppressing individual events and is not
/// acted upon yet; return `true`.
pub trait KeyHandler: Send {
    /// Called when a tracked key goes down.
    fn on_key_down(&mut self, key: &str) -> bool;

    /// Called when a tracked key comes up.
    fn on_key_up(&mut self, key: &str) -> bool;
}

impl<H: KeyHandler + ?Sized> KeyHandler for Box<H> {
    fn on_key_down(&mut self, key: &str) -> bool {
        (**self).on_key_down(key)
    }

    fn on_key_up(&mut self, key: &str) -> bool {
        (**self).on_key_up(key)
    }
}

/// A [`KeyHandler`] built from a pair of closures.
///
/// # Example
///
/// ```
/// use xkeyctl::{FnKeyHandler, KeyHandler};
///
/// let mut handler = FnKeyHandler::new(
///     |key: &str| {
///         println!("down {key}");
///         true
///     },
///     |key: &str| {
///         println!("up {key}");
///         true
///     },
/// );
/// handler.on_key_down("a");
/// ```
pub struct FnKeyHandler<D, U> {
    down: D,
    up: U,
}

impl<D, U> FnKeyHandler<D, U>
where
    D: FnMut(&str) -> bool + Send,
    U: FnMut(&str) -> bool + Send,
{
    pub fn new(down: D, up: U) -> Self {
        Self { down, up }
    }
}

impl<D, U> KeyHandler for FnKeyHandler<D, U>
where
    D: FnMut(&str) -> bool + Send,
    U: FnMut(&str) -> bool + Send,
{
    fn on_key_down(&mut self, key: &str) -> bool {
        (self.down)(key)
    }

    fn on_key_up(&mut self, key: &str) -> bool {
        (self.up)(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_handler_routes_edges() {
        let mut downs = Vec::new();
        let mut ups = Vec::new();
        {
            let mut handler = FnKeyHandler::new(
                |key: &str| {
                    downs.push(key.to_string());
                    true
                },
                |key: &str| {
                    ups.push(key.to_string());
                    false
                },
            );
            assert!(handler.on_key_down("a"));
            assert!(!handler.on_key_up("s"));
        }
        assert_eq!(downs, vec!["a"]);
        assert_eq!(ups, vec!["s"]);
    }

    #[test]
    fn test_boxed_handler() {
        let mut boxed: Box<dyn KeyHandler> =
            Box::new(FnKeyHandler::new(|_: &str| true, |_: &str| true));
        assert!(boxed.on_key_down("space"));
        assert!(boxed.on_key_up("space"));
    }
}
