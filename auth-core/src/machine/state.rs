use std::fmt;

use serde::{Serialize, Serializer};

/// Sub-states of `login-required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginStep {
    Idle,
    SelectEoaWallet,
    WaitForEmailOtp,
    Started,
    Deployment,
    /// Final sub-state; the composite is done once it is reached
    Complete,
}

impl LoginStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStep::Idle => "idle",
            LoginStep::SelectEoaWallet => "selectEOAWallet",
            LoginStep::WaitForEmailOtp => "waitForEmailOTP",
            LoginStep::Started => "started",
            LoginStep::Deployment => "deployment",
            LoginStep::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Loading,
    LoginRequired(LoginStep),
    WrongNetwork,
    Profile,
    /// Dispatch state; never rests here
    IncomingRequest,
    IncomingAuthentication,
    IncomingSignature,
    IncomingTransaction,
    /// Per-request terminal state; never rests here
    Completed,
}

impl State {
    /// Top-level region name, without the login sub-state.
    pub fn region(&self) -> &'static str {
        match self {
            State::Loading => "loading",
            State::LoginRequired(_) => "login-required",
            State::WrongNetwork => "wrong-network",
            State::Profile => "profile",
            State::IncomingRequest => "incoming-request",
            State::IncomingAuthentication => "incoming-authentication",
            State::IncomingSignature => "incoming-signature",
            State::IncomingTransaction => "incoming-transaction",
            State::Completed => "completed",
        }
    }

    /// One of the three approval screens.
    pub fn is_awaiting_approval(&self) -> bool {
        matches!(
            self,
            State::IncomingAuthentication | State::IncomingSignature | State::IncomingTransaction
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::LoginRequired(step) => write!(f, "{}.{}", self.region(), step.as_str()),
            _ => f.write_str(self.region()),
        }
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_names() {
        assert_eq!(State::LoginRequired(LoginStep::SelectEoaWallet).to_string(), "login-required.selectEOAWallet");
        assert_eq!(State::IncomingTransaction.to_string(), "incoming-transaction");
        assert_eq!(serde_json::to_value(State::Profile).unwrap(), "profile");
    }
}
