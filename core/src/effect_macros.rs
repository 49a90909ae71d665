//! Declarative macros for ergonomic effect construction
//!
//! Reducers describe collaborator calls as async blocks; these macros remove
//! the `Box::pin` noise.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use offline_desk_core::async_effect;
///
/// async_effect! {
///     let result = directory.lookup_by_mobile(&mobile).await;
///     Some(RiderAction::LookupCompleted { generation, result })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Looked { digits: usize },
    }

    #[test]
    fn test_async_effect_macro() {
        let mobile = String::from("9999999999");
        let effect = async_effect! {
            Some(TestAction::Looked { digits: mobile.len() })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[tokio::test]
    async fn test_async_effect_macro_resolves() {
        let effect = async_effect! {
            Some(TestAction::Looked { digits: 10 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds a future");
        };
        assert_eq!(fut.await, Some(TestAction::Looked { digits: 10 }));
    }
}
