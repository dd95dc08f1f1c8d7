//! Classification of RFC 3463 enhanced status codes into a three tier
//! taxonomy: the class (first digit), the subject (second digit) and,
//! when the subject/detail pair is a registered code, the detail.
use crate::StatusCodeError;
use serde::Serialize;
use std::cmp::Ordering;

/// The first digit of an enhanced status code
#[derive(
    Serialize,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Copy,
    Clone,
    Ord,
    PartialOrd,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
pub enum StatusClass {
    /// 2.X.X
    Success,
    /// 4.X.X; the message may be delivered if it is resent later
    PersistentTransientFailure,
    /// 5.X.X; resending the message in its current form will not succeed
    PermanentFailure,
}

/// The second digit of an enhanced status code
#[derive(
    Serialize,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Copy,
    Clone,
    Ord,
    PartialOrd,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
pub enum StatusSubject {
    /// X.0.XXX, and the fallback for unregistered subjects
    OtherOrUndefinedStatus,
    /// X.1.XXX
    AddressingStatus,
    /// X.2.XXX
    MailboxStatus,
    /// X.3.XXX
    MailSystemStatus,
    /// X.4.XXX
    NetworkAndRoutingStatus,
    /// X.5.XXX
    MailDeliveryProtocolStatus,
    /// X.6.XXX
    MessageContentOrMediaStatus,
    /// X.7.XXX
    SecurityOrPolicyStatus,
}

/// The registered subject/detail combinations.
///
/// Declaration order matters: a later variant is considered more
/// specific than an earlier one when two codes are compared with
/// [StatusCodeClassification::is_more_specific_than].
#[derive(
    Serialize,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Copy,
    Clone,
    Ord,
    PartialOrd,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
)]
pub enum StatusDetail {
    /// X.0.0
    OtherUndefinedStatus,

    /// X.1.0
    OtherAddressStatus,
    /// X.1.1
    BadDestinationMailboxAddress,
    /// X.1.2
    BadDestinationSystemAddress,
    /// X.1.3
    BadDestinationMailboxAddressSyntax,
    /// X.1.4
    DestinationMailboxAddressAmbiguous,
    /// X.1.5
    DestinationAddressValid,
    /// X.1.6
    DestinationMailboxMovedNoForwardingAddress,
    /// X.1.7
    BadSendersMailboxAddressSyntax,
    /// X.1.8
    BadSendersSystemAddress,

    /// X.2.0
    OtherOrUndefinedMailboxStatus,
    /// X.2.1
    MailboxDisabled,
    /// X.2.2
    MailboxFull,
    /// X.2.3
    MessageLengthExceedsAdministrativeLimit,
    /// X.2.4
    MailingListExpansionProblem,

    /// X.3.0
    OtherOrUndefinedMailSystemStatus,
    /// X.3.1
    MailSystemFull,
    /// X.3.2
    SystemNotAcceptingNetworkMessages,
    /// X.3.3
    SystemNotCapableOfSelectedFeatures,
    /// X.3.4
    MessageTooBigForSystem,
    /// X.3.5
    SystemIncorrectlyConfigured,

    /// X.4.0
    OtherOrUndefinedNetworkOrRoutingStatus,
    /// X.4.1
    NoAnswerFromHost,
    /// X.4.2
    BadConnection,
    /// X.4.3
    DirectoryServerFailure,
    /// X.4.4
    UnableToRoute,
    /// X.4.5
    MailSystemCongestion,
    /// X.4.6
    RoutingLoopDetected,
    /// X.4.7
    DeliveryTimeExpired,

    /// X.5.0
    OtherOrUndefinedProtocolStatus,
    /// X.5.1
    InvalidCommand,
    /// X.5.2
    SyntaxError,
    /// X.5.3
    TooManyRecipients,
    /// X.5.4
    InvalidCommandArguments,
    /// X.5.5
    WrongProtocolVersion,

    /// X.6.0
    OtherOrUndefinedMediaError,
    /// X.6.1
    MediaNotSupported,
    /// X.6.2
    ConversionRequiredAndProhibited,
    /// X.6.3
    ConversionRequiredButNotSupported,
    /// X.6.4
    ConversionWithLossPerformed,
    /// X.6.5
    ConversionFailed,

    /// X.7.0
    OtherOrUndefinedSecurityStatus,
    /// X.7.1
    DeliveryNotAuthorizedMessageRefused,
    /// X.7.2
    MailingListExpansionProhibited,
    /// X.7.3
    SecurityConversionRequiredButNotPossible,
    /// X.7.4
    SecurityFeaturesNotSupported,
    /// X.7.5
    CryptographicFailure,
    /// X.7.6
    CryptographicAlgorithmNotSupported,
    /// X.7.7
    MessageIntegrityFailure,
}

impl StatusDetail {
    /// Returns the subject under which this detail is registered
    pub fn subject(self) -> StatusSubject {
        use StatusDetail::*;
        match self {
            OtherUndefinedStatus => StatusSubject::OtherOrUndefinedStatus,
            OtherAddressStatus
            | BadDestinationMailboxAddress
            | BadDestinationSystemAddress
            | BadDestinationMailboxAddressSyntax
            | DestinationMailboxAddressAmbiguous
            | DestinationAddressValid
            | DestinationMailboxMovedNoForwardingAddress
            | BadSendersMailboxAddressSyntax
            | BadSendersSystemAddress => StatusSubject::AddressingStatus,
            OtherOrUndefinedMailboxStatus
            | MailboxDisabled
            | MailboxFull
            | MessageLengthExceedsAdministrativeLimit
            | MailingListExpansionProblem => StatusSubject::MailboxStatus,
            OtherOrUndefinedMailSystemStatus
            | MailSystemFull
            | SystemNotAcceptingNetworkMessages
            | SystemNotCapableOfSelectedFeatures
            | MessageTooBigForSystem
            | SystemIncorrectlyConfigured => StatusSubject::MailSystemStatus,
            OtherOrUndefinedNetworkOrRoutingStatus
            | NoAnswerFromHost
            | BadConnection
            | DirectoryServerFailure
            | UnableToRoute
            | MailSystemCongestion
            | RoutingLoopDetected
            | DeliveryTimeExpired => StatusSubject::NetworkAndRoutingStatus,
            OtherOrUndefinedProtocolStatus
            | InvalidCommand
            | SyntaxError
            | TooManyRecipients
            | InvalidCommandArguments
            | WrongProtocolVersion => StatusSubject::MailDeliveryProtocolStatus,
            OtherOrUndefinedMediaError
            | MediaNotSupported
            | ConversionRequiredAndProhibited
            | ConversionRequiredButNotSupported
            | ConversionWithLossPerformed
            | ConversionFailed => StatusSubject::MessageContentOrMediaStatus,
            OtherOrUndefinedSecurityStatus
            | DeliveryNotAuthorizedMessageRefused
            | MailingListExpansionProhibited
            | SecurityConversionRequiredButNotPossible
            | SecurityFeaturesNotSupported
            | CryptographicFailure
            | CryptographicAlgorithmNotSupported
            | MessageIntegrityFailure => StatusSubject::SecurityOrPolicyStatus,
        }
    }
}

/// Looks up the exact `subject.detail` pair in the RFC 3463 catalogue
fn lookup_detail(subject: &str, detail: &str) -> Option<StatusDetail> {
    use StatusDetail::*;
    Some(match (subject, detail) {
        ("0", "0") => OtherUndefinedStatus,

        ("1", "0") => OtherAddressStatus,
        ("1", "1") => BadDestinationMailboxAddress,
        ("1", "2") => BadDestinationSystemAddress,
        ("1", "3") => BadDestinationMailboxAddressSyntax,
        ("1", "4") => DestinationMailboxAddressAmbiguous,
        ("1", "5") => DestinationAddressValid,
        ("1", "6") => DestinationMailboxMovedNoForwardingAddress,
        ("1", "7") => BadSendersMailboxAddressSyntax,
        ("1", "8") => BadSendersSystemAddress,

        ("2", "0") => OtherOrUndefinedMailboxStatus,
        ("2", "1") => MailboxDisabled,
        ("2", "2") => MailboxFull,
        ("2", "3") => MessageLengthExceedsAdministrativeLimit,
        ("2", "4") => MailingListExpansionProblem,

        ("3", "0") => OtherOrUndefinedMailSystemStatus,
        ("3", "1") => MailSystemFull,
        ("3", "2") => SystemNotAcceptingNetworkMessages,
        ("3", "3") => SystemNotCapableOfSelectedFeatures,
        ("3", "4") => MessageTooBigForSystem,
        ("3", "5") => SystemIncorrectlyConfigured,

        ("4", "0") => OtherOrUndefinedNetworkOrRoutingStatus,
        ("4", "1") => NoAnswerFromHost,
        ("4", "2") => BadConnection,
        ("4", "3") => DirectoryServerFailure,
        ("4", "4") => UnableToRoute,
        ("4", "5") => MailSystemCongestion,
        ("4", "6") => RoutingLoopDetected,
        ("4", "7") => DeliveryTimeExpired,

        ("5", "0") => OtherOrUndefinedProtocolStatus,
        ("5", "1") => InvalidCommand,
        ("5", "2") => SyntaxError,
        ("5", "3") => TooManyRecipients,
        ("5", "4") => InvalidCommandArguments,
        ("5", "5") => WrongProtocolVersion,

        ("6", "0") => OtherOrUndefinedMediaError,
        ("6", "1") => MediaNotSupported,
        ("6", "2") => ConversionRequiredAndProhibited,
        ("6", "3") => ConversionRequiredButNotSupported,
        ("6", "4") => ConversionWithLossPerformed,
        ("6", "5") => ConversionFailed,

        ("7", "0") => OtherOrUndefinedSecurityStatus,
        ("7", "1") => DeliveryNotAuthorizedMessageRefused,
        ("7", "2") => MailingListExpansionProhibited,
        ("7", "3") => SecurityConversionRequiredButNotPossible,
        ("7", "4") => SecurityFeaturesNotSupported,
        ("7", "5") => CryptographicFailure,
        ("7", "6") => CryptographicAlgorithmNotSupported,
        ("7", "7") => MessageIntegrityFailure,

        _ => return None,
    })
}

fn lookup_subject(subject: &str) -> Option<StatusSubject> {
    use StatusSubject::*;
    Some(match subject {
        "0" => OtherOrUndefinedStatus,
        "1" => AddressingStatus,
        "2" => MailboxStatus,
        "3" => MailSystemStatus,
        "4" => NetworkAndRoutingStatus,
        "5" => MailDeliveryProtocolStatus,
        "6" => MessageContentOrMediaStatus,
        "7" => SecurityOrPolicyStatus,
        _ => return None,
    })
}

/// Any one of the facets that make up a classification
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Facet {
    Class(StatusClass),
    Subject(StatusSubject),
    Detail(StatusDetail),
}

impl From<StatusClass> for Facet {
    fn from(c: StatusClass) -> Facet {
        Facet::Class(c)
    }
}

impl From<StatusSubject> for Facet {
    fn from(s: StatusSubject) -> Facet {
        Facet::Subject(s)
    }
}

impl From<StatusDetail> for Facet {
    fn from(d: StatusDetail) -> Facet {
        Facet::Detail(d)
    }
}

/// The result of classifying an enhanced status code.
///
/// The class and subject are always present. The detail is only
/// present when the subject/detail pair is a registered code; unknown
/// details (and unknown subjects) are valid extension points and are
/// not treated as errors.
#[derive(Serialize, Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct StatusCodeClassification {
    class: StatusClass,
    subject: StatusSubject,
    detail: Option<StatusDetail>,
}

impl StatusCodeClassification {
    pub fn class(&self) -> StatusClass {
        self.class
    }

    pub fn subject(&self) -> StatusSubject {
        self.subject
    }

    pub fn detail(&self) -> Option<StatusDetail> {
        self.detail
    }

    pub fn contains<F: Into<Facet>>(&self, facet: F) -> bool {
        match facet.into() {
            Facet::Class(c) => self.class == c,
            Facet::Subject(s) => self.subject == s,
            Facet::Detail(d) => self.detail == Some(d),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class == StatusClass::PersistentTransientFailure
    }

    pub fn is_permanent(&self) -> bool {
        self.class == StatusClass::PermanentFailure
    }

    /// The ordering key used to compare how much of a code was resolved.
    /// A resolved detail outranks any subject-only classification, which
    /// in turn is ranked by subject and then by class.
    fn specificity(&self) -> (Option<StatusDetail>, StatusSubject, StatusClass) {
        (self.detail, self.subject, self.class)
    }

    /// Returns true if `self` carries strictly more specific information
    /// than `other`
    pub fn is_more_specific_than(&self, other: &Self) -> bool {
        self.specificity() > other.specificity()
    }
}

impl PartialOrd for StatusCodeClassification {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StatusCodeClassification {
    fn cmp(&self, other: &Self) -> Ordering {
        self.specificity().cmp(&other.specificity())
    }
}

impl std::fmt::Display for StatusCodeClassification {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}/{}", self.class, self.subject)?;
        if let Some(detail) = self.detail {
            write!(fmt, "/{detail}")?;
        }
        Ok(())
    }
}

/// Classify an enhanced status code such as `5.1.1`.
///
/// The code must have class, subject and detail segments separated by
/// `.`, and the class must be one of `2`, `4` or `5`. Unregistered
/// subject or detail values classify as far as they are known.
pub fn classify(code: &str) -> Result<StatusCodeClassification, StatusCodeError> {
    let code = code.trim();
    let mut fields = code.splitn(3, '.');
    let (class, subject, detail) = match (fields.next(), fields.next(), fields.next()) {
        (Some(class), Some(subject), Some(detail)) => (class, subject, detail),
        _ => return Err(StatusCodeError::Malformed(code.to_string())),
    };

    let class = match class {
        "2" => StatusClass::Success,
        "4" => StatusClass::PersistentTransientFailure,
        "5" => StatusClass::PermanentFailure,
        _ => return Err(StatusCodeError::UnsupportedClass(code.to_string())),
    };

    if let Some(detail) = lookup_detail(subject, detail) {
        return Ok(StatusCodeClassification {
            class,
            subject: detail.subject(),
            detail: Some(detail),
        });
    }

    let subject = lookup_subject(subject).unwrap_or_else(|| {
        tracing::trace!("unregistered subject in status code {code}");
        StatusSubject::OtherOrUndefinedStatus
    });

    Ok(StatusCodeClassification {
        class,
        subject,
        detail: None,
    })
}

/// Classify `code` and render the facets as a `/` separated string,
/// intended for display and diagnostics
pub fn classification_string(code: &str) -> Result<String, StatusCodeError> {
    classify(code).map(|c| c.to_string())
}
