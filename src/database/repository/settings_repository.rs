use crate::config::AppSettings;
use crate::entity::prelude::*;
use crate::entity::settings;
use crate::error::SettingsError;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

/// 设置仓库
pub struct SettingsRepository;

impl SettingsRepository {
    /// 确保 settings 表存在
    pub async fn ensure_table(db: &DatabaseConnection) -> Result<(), DbErr> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let mut create = schema.create_table_from_entity(Settings);
        create.if_not_exists();
        db.execute(backend.build(&create)).await?;
        Ok(())
    }

    /// 读取单个设置项
    pub async fn get(db: &DatabaseConnection, key: &str) -> Result<Option<String>, DbErr> {
        Self::ensure_table(db).await?;
        Ok(Settings::find_by_id(key.to_string())
            .one(db)
            .await?
            .map(|m| m.value))
    }

    /// 写入单个设置项（存在则覆盖）
    pub async fn set_raw(db: &DatabaseConnection, key: &str, value: &str) -> Result<(), DbErr> {
        Self::ensure_table(db).await?;

        let model = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Some(chrono::Utc::now().timestamp())),
        };

        Settings::insert(model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    /// 读取全部设置，未保存的项使用默认值
    pub async fn load(db: &DatabaseConnection) -> Result<AppSettings, SettingsError> {
        Self::ensure_table(db).await?;

        let mut app_settings = AppSettings::default();
        let rows = Settings::find()
            .order_by_asc(settings::Column::Key)
            .all(db)
            .await?;
        for row in rows {
            match app_settings.apply(&row.key, &row.value) {
                Ok(()) => {}
                // 库里的旧键或坏值不影响启动
                Err(e) => log::warn!("忽略设置项 {}: {}", row.key, e),
            }
        }
        Ok(app_settings)
    }

    /// 校验后写入设置项，返回更新后的完整设置
    pub async fn set(
        db: &DatabaseConnection,
        key: &str,
        value: &str,
    ) -> Result<AppSettings, SettingsError> {
        let mut app_settings = Self::load(db).await?;
        app_settings.apply(key, value)?;
        Self::set_raw(db, key, value).await?;
        Ok(app_settings)
    }
}
