use std::{fmt, str::FromStr};

use tracing::debug;

use crate::{error::ClientError, models::Source, session::Session};

/// Views the client can navigate to. Feed and article views are protected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Register,
    Feed { source: Source },
    Article { source: Source, id: i64 },
}

impl Route {
    pub fn is_protected(&self) -> bool {
        matches!(self, Self::Feed { .. } | Self::Article { .. })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Landing => f.write_str("/"),
            Self::Login => f.write_str("/login"),
            Self::Register => f.write_str("/register"),
            Self::Feed { source } => write!(f, "/home/{}", source.key()),
            Self::Article { source, id } => write!(f, "/home/{}/{id}", source.key()),
        }
    }
}

impl FromStr for Route {
    type Err = ClientError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let segments = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        match segments.as_slice() {
            [] => Ok(Self::Landing),
            ["login"] => Ok(Self::Login),
            ["register"] => Ok(Self::Register),
            ["home", source] => Ok(Self::Feed {
                source: Source::parse(source)?,
            }),
            ["home", source, id] => Ok(Self::Article {
                source: Source::parse(source)?,
                id: id
                    .parse()
                    .map_err(|_| ClientError::InvalidRequest(format!("Invalid article id '{id}'")))?,
            }),
            _ => Err(ClientError::InvalidRequest(format!("Unknown route '{path}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow(Route),
    Redirect(Route),
}

impl Navigation {
    pub fn target(&self) -> &Route {
        match self {
            Self::Allow(route) | Self::Redirect(route) => route,
        }
    }
}

/// Gate in front of protected views. Holds no state; every navigation is
/// checked against the session as it is at that moment.
pub struct RouteGuard;

impl RouteGuard {
    pub fn check(session: &Session, route: &Route) -> Navigation {
        if !route.is_protected() || session.is_authenticated() {
            return Navigation::Allow(route.clone());
        }
        debug!(route = %route, "Anonymous session, redirecting to landing");
        Navigation::Redirect(Route::Landing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fixtures::token_pair, SessionIdentity};

    fn sign_in(session: &Session) {
        let tokens = token_pair(1);
        let identity = SessionIdentity::decode(tokens.access()).unwrap();
        session.authenticate(tokens, identity);
    }

    #[test]
    fn public_routes_are_always_allowed() {
        let session = Session::new();
        for route in [Route::Landing, Route::Login, Route::Register] {
            assert_eq!(RouteGuard::check(&session, &route), Navigation::Allow(route.clone()));
        }
    }

    #[test]
    fn protected_routes_follow_current_session() {
        let session = Session::new();
        let article = Route::Article { source: Source::Onlinekhabar, id: 4 };

        assert_eq!(RouteGuard::check(&session, &article), Navigation::Redirect(Route::Landing));

        sign_in(&session);
        assert_eq!(RouteGuard::check(&session, &article), Navigation::Allow(article.clone()));

        session.clear();
        let nav = RouteGuard::check(&session, &article);
        assert_eq!(nav.target(), &Route::Landing);
    }

    #[test]
    fn routes_round_trip_through_paths() {
        let article: Route = "/home/nagarik/17".parse().unwrap();
        assert_eq!(article, Route::Article { source: Source::Nagarik, id: 17 });
        assert_eq!(article.to_string(), "/home/nagarik/17");
        assert_eq!("/".parse::<Route>().unwrap(), Route::Landing);
        assert_eq!("/login/".parse::<Route>().unwrap(), Route::Login);

        assert!(matches!("/home/bbc".parse::<Route>(), Err(ClientError::UnknownSource(_))));
        assert!(matches!("/home/ekantipur/x".parse::<Route>(), Err(ClientError::InvalidRequest(_))));
    }
}
