//! Client-side navigation guard.
//!
//! Routes carry two flags. `requires_auth` pages bounce anonymous visitors to the
//! login page, and `requires_guest` pages bounce signed-in users to the task list.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::client::{AuthApi, AuthStore, TokenStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Tasks,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Login, Route::Register, Route::Tasks];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Tasks => "/",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Tasks)
    }

    pub fn requires_guest(self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Route),
}

impl Navigation {
    /// The route the user ends up on when heading for `to`.
    pub fn destination(self, to: Route) -> Route {
        match self {
            Navigation::Proceed => to,
            Navigation::Redirect(route) => route,
        }
    }
}

pub fn guard(to: Route, is_authenticated: bool) -> Navigation {
    if to.requires_auth() && !is_authenticated {
        Navigation::Redirect(Route::Login)
    } else if to.requires_guest() && is_authenticated {
        Navigation::Redirect(Route::Tasks)
    } else {
        Navigation::Proceed
    }
}

/// Read access to the session state the guard decides on.
pub trait AuthStatus {
    fn is_authenticated(&self) -> bool;
}

impl AuthStatus for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

impl<A: AuthApi, S: TokenStorage> AuthStatus for AuthStore<A, S> {
    fn is_authenticated(&self) -> bool {
        AuthStore::is_authenticated(self)
    }
}

pub struct Router {
    current: Mutex<Route>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}

impl Router {
    pub fn new(initial: Route) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> Route {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies the guard and moves to wherever it sends us.
    pub fn navigate(&self, to: Route, auth: &impl AuthStatus) -> Route {
        let decision = guard(to, auth.is_authenticated());
        if let Navigation::Redirect(target) = decision {
            log::debug!("navigation to {} redirected to {}", to, target);
        }
        let destination = decision.destination(to);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = destination;
        destination
    }
}
