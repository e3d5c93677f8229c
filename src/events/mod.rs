pub mod codec;
pub mod query;
pub mod repository;
pub mod schema;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Undefined has code 0 and is the fallback for unknown stored names.
macro_rules! symbolic_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal, $prefix:literal {
            Undefined = $undefined:literal,
            $($variant:ident = $code:literal => $sym:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            Undefined,
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$name::Undefined, $($name::$variant),+];

            pub fn as_str_name(&self) -> &'static str {
                match self {
                    $name::Undefined => $undefined,
                    $($name::$variant => $sym),+
                }
            }

            pub fn from_str_name(name: &str) -> Option<Self> {
                match name {
                    $undefined => Some($name::Undefined),
                    $($sym => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn code(&self) -> i32 {
                match self {
                    $name::Undefined => 0,
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: i32) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.code() == code)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::Undefined
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str_name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase().replace('-', "_");
                Self::from_str_name(&upper)
                    .or_else(|| Self::from_str_name(&format!("{}{}", $prefix, upper)))
                    .ok_or_else(|| format!("unknown {} `{}`", $kind, s))
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str_name())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                $name::from_str_name(&name).ok_or_else(|| {
                    serde::de::Error::custom(format!("unknown {} `{}`", $kind, name))
                })
            }
        }
    };
}

symbolic_enum! {
    EventType, "event type", "EVENT_TYPE_" {
        Undefined = "EVENT_TYPE_UNDEFINED",
        AlamedaScalerCreate = 1 => "EVENT_TYPE_ALAMEDA_SCALER_CREATE",
        AlamedaScalerDelete = 2 => "EVENT_TYPE_ALAMEDA_SCALER_DELETE",
        NodeRegister = 3 => "EVENT_TYPE_NODE_REGISTER",
        DeploymentRegister = 4 => "EVENT_TYPE_DEPLOYMENT_REGISTER",
        DeploymentConfigRegister = 5 => "EVENT_TYPE_DEPLOYMENT_CONFIG_REGISTER",
        PodRegister = 6 => "EVENT_TYPE_POD_REGISTER",
        NamespaceRegister = 7 => "EVENT_TYPE_NAMESPACE_REGISTER",
        VpaRecommendationExecutor = 8 => "EVENT_TYPE_VPA_RECOMMENDATION_EXECUTOR",
        AnomalyMetricDetect = 9 => "EVENT_TYPE_ANOMALY_METRIC_DETECT",
        License = 10 => "EVENT_TYPE_LICENSE",
        EmailNotification = 11 => "EVENT_TYPE_EMAIL_NOTIFICATION",
    }
}

symbolic_enum! {
    EventVersion, "event version", "EVENT_VERSION_" {
        Undefined = "EVENT_VERSION_UNDEFINED",
        V1 = 1 => "EVENT_VERSION_V1",
    }
}

symbolic_enum! {
    EventLevel, "event level", "EVENT_LEVEL_" {
        Undefined = "EVENT_LEVEL_UNDEFINED",
        Debug = 1 => "EVENT_LEVEL_DEBUG",
        Info = 2 => "EVENT_LEVEL_INFO",
        Warning = 3 => "EVENT_LEVEL_WARNING",
        Error = 4 => "EVENT_LEVEL_ERROR",
        Fatal = 5 => "EVENT_LEVEL_FATAL",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSource {
    pub host: String,
    pub component: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub source: EventSource,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default)]
    pub version: EventVersion,
    #[serde(default)]
    pub level: EventLevel,
    #[serde(default)]
    pub subject: ObjectReference,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: String,
}

impl Event {
    pub fn new(time: DateTime<Utc>, id: &str, cluster_id: &str) -> Self {
        Self {
            time,
            id: id.to_string(),
            cluster_id: cluster_id.to_string(),
            source: EventSource::default(),
            event_type: EventType::Undefined,
            version: EventVersion::Undefined,
            level: EventLevel::Undefined,
            subject: ObjectReference::default(),
            message: String::new(),
            data: String::new(),
        }
    }
}
