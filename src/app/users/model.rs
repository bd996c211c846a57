//! 用户数据模型

use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::serialize_object_id_as_hex_string};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// 存储中的用户记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "_id", serialize_with = "serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_age")]
    pub age: f64,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// 通过校验、可以写入存储的新用户
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: f64,
}

/// 部分更新，`None` 表示保持原值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<f64>,
}

/// 创建用户请求
///
/// 字段保持原始 JSON 值，由 [`CreateUserRequest::into_new_user`] 做类型转换，
/// 这样缺失字段和类型错误都能汇总成一条校验信息。多余字段被忽略。
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub age: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub message: &'static str,
    #[serde(rename = "allUsers")]
    pub all_users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub message: &'static str,
    #[serde(rename = "newUser")]
    pub new_user: User,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub message: &'static str,
    #[serde(rename = "updatedUser")]
    pub updated_user: User,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub message: &'static str,
    #[serde(rename = "deletesdUser")]
    pub deleted_user: User,
}

impl UserPatch {
    /// 从任意 JSON 对象提取可更新字段
    ///
    /// `_id` 和未知字段被忽略，`null` 视为未提供。
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, String> {
        let mut errors = Vec::new();
        let mut patch = UserPatch::default();

        let present = |key: &str| body.get(key).filter(|v| !v.is_null());

        if let Some(value) = present("name") {
            match coerce_text(value) {
                Some(name) => patch.name = Some(name),
                None => errors.push(cast_error("name", "String", value)),
            }
        }
        if let Some(value) = present("email") {
            match coerce_text(value) {
                Some(email) => patch.email = Some(email),
                None => errors.push(cast_error("email", "String", value)),
            }
        }
        if let Some(value) = present("age") {
            match coerce_number(value) {
                Some(age) => patch.age = Some(age),
                None => errors.push(cast_error("age", "Number", value)),
            }
        }

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(format!("User update failed: {}", errors.join(", ")))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }

    /// 把修改应用到已有记录上
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(age) = self.age {
            user.age = age;
        }
    }
}

impl CreateUserRequest {
    /// 转换为新用户，三个字段都必须存在且文本非空
    pub fn into_new_user(self) -> Result<NewUser, String> {
        let mut errors = Vec::new();

        let name = required_text("name", self.name.as_ref(), &mut errors);
        let email = required_text("email", self.email.as_ref(), &mut errors);
        let age = match self.age.as_ref() {
            None => {
                errors.push("age is required".to_string());
                None
            }
            Some(value) => {
                let age = coerce_number(value);
                if age.is_none() {
                    errors.push(cast_error("age", "Number", value));
                }
                age
            }
        };

        match (name, email, age) {
            (Some(name), Some(email), Some(age)) if errors.is_empty() => {
                Ok(NewUser { name, email, age })
            }
            _ => Err(format!("User validation failed: {}", errors.join(", "))),
        }
    }
}

fn required_text(field: &str, value: Option<&Value>, errors: &mut Vec<String>) -> Option<String> {
    let Some(value) = value else {
        errors.push(format!("{} is required", field));
        return None;
    };
    match coerce_text(value) {
        Some(text) if text.is_empty() => {
            errors.push(format!("{} is required", field));
            None
        }
        Some(text) => Some(text),
        None => {
            errors.push(cast_error(field, "String", value));
            None
        }
    }
}

fn cast_error(field: &str, kind: &str, value: &Value) -> String {
    format!("{}: cast to {} failed for value {}", field, kind, value)
}

/// 文本字段接受字符串，数字和布尔值转换为文本
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 数字字段接受 JSON 数字、可解析的数字字符串和布尔值（true 为 1，false 为 0）
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// 整数年龄按整数输出，避免出现 `30.0`
fn serialize_age<S: Serializer>(age: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if age.fract() == 0.0 && age.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*age as i64)
    } else {
        serializer.serialize_f64(*age)
    }
}
