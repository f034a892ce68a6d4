// ==========================================
// 建材商品目录系统 - 商品导入 API
// ==========================================
// 职责: 导入会话状态机
// 状态: idle → validating → {valid, invalid} → importing → {completed, failed}
// 约束:
// - 仅 valid 状态可开始导入
// - 超过确认阈值的行数需显式确认
// - 重新选择格式/文件回到 idle
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::auth::{permissions, AuthService};
use crate::config::ImportLimits;
use crate::domain::format::ExcelFormat;
use crate::domain::import::{
    BatchResult, ImportPhase, ImportProgress, SpreadsheetFile, ValidationResult,
};
use crate::domain::types::{Action, Resource};
use crate::i18n;
use crate::importer::{FormatRegistry, ProductImporter, TemplateFile};
use crate::repository::BrandRepository;

/// 导入会话内部状态
#[derive(Debug)]
struct ImportSession {
    phase: ImportPhase,
    brand_id: Option<String>,
    format: Option<ExcelFormat>,
    file: Option<SpreadsheetFile>,
    validation: Option<ValidationResult>,
    result: Option<BatchResult>,
    progress: Option<ImportProgress>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self {
            phase: ImportPhase::Idle,
            brand_id: None,
            format: None,
            file: None,
            validation: None,
            result: None,
            progress: None,
        }
    }
}

impl ImportSession {
    /// 丢弃上一次的校验/导入结果
    fn back_to_idle(&mut self) {
        self.phase = ImportPhase::Idle;
        self.validation = None;
        self.result = None;
        self.progress = None;
    }
}

/// 导入进行中守卫: 未正常结束（future 被丢弃）时把会话置为 failed
struct ImportingGuard<'a> {
    session: &'a Mutex<ImportSession>,
    finished: bool,
}

impl<'a> ImportingGuard<'a> {
    fn new(session: &'a Mutex<ImportSession>) -> Self {
        Self {
            session,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for ImportingGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut session = match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if session.phase == ImportPhase::Importing {
            warn!("导入被中断，会话置为 failed");
            session.phase = ImportPhase::Failed;
        }
    }
}

/// 会话快照（前端展示用）
#[derive(Debug, Clone, Serialize)]
pub struct ImportSnapshot {
    pub phase: ImportPhase,
    pub format_id: Option<String>,
    pub file_name: Option<String>,
    pub validation: Option<ValidationResult>,
    pub result: Option<BatchResult>,
    pub progress: Option<ImportProgress>,
    /// 结果面板展示的错误（前 10 条 + 剩余数量）
    pub visible_errors: Vec<String>,
}

// ==========================================
// ImportApi - 导入 API
// ==========================================
pub struct ImportApi {
    auth: Arc<AuthService>,
    importer: Arc<dyn ProductImporter>,
    formats: Arc<FormatRegistry>,
    brand_repo: Arc<BrandRepository>,
    limits: ImportLimits,
    session: Mutex<ImportSession>,
}

impl ImportApi {
    pub fn new(
        auth: Arc<AuthService>,
        importer: Arc<dyn ProductImporter>,
        formats: Arc<FormatRegistry>,
        brand_repo: Arc<BrandRepository>,
        limits: ImportLimits,
    ) -> Self {
        Self {
            auth,
            importer,
            formats,
            brand_repo,
            limits,
            session: Mutex::new(ImportSession::default()),
        }
    }

    fn session(&self) -> ApiResult<MutexGuard<'_, ImportSession>> {
        self.session
            .lock()
            .map_err(|e| ApiError::InternalError(format!("导入会话锁获取失败: {}", e)))
    }

    fn authorize(&self, resource: Resource, action: Action) -> ApiResult<()> {
        let user = self.auth.current_user().ok_or(ApiError::Unauthenticated)?;
        if !permissions::has_permission(user.role, resource, action) {
            return Err(ApiError::PermissionDenied { resource, action });
        }
        Ok(())
    }

    fn ensure_not_importing(session: &ImportSession) -> ApiResult<()> {
        if session.phase == ImportPhase::Importing {
            return Err(ApiError::BusinessRuleViolation(i18n::t("import.already_running")));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ApiResult<ImportSnapshot> {
        let session = self.session()?;
        Ok(ImportSnapshot {
            phase: session.phase,
            format_id: session.format.as_ref().map(|f| f.id.clone()),
            file_name: session.file.as_ref().map(|f| f.name.clone()),
            validation: session.validation.clone(),
            result: session.result.clone(),
            progress: session.progress,
            visible_errors: session
                .result
                .as_ref()
                .map(|r| r.visible_errors())
                .unwrap_or_default(),
        })
    }

    pub fn phase(&self) -> ApiResult<ImportPhase> {
        Ok(self.session()?.phase)
    }

    /// 选择导入格式（回到 idle）
    pub fn select_format(&self, brand_id: &str, format_id: &str) -> ApiResult<()> {
        self.authorize(Resource::ExcelFormats, Action::Read)?;
        let format = self
            .formats
            .get_format(format_id)?
            .filter(|f| f.brand_id == brand_id)
            .ok_or_else(|| ApiError::NotFound(format!("ExcelFormat(id={})不存在", format_id)))?;

        let mut session = self.session()?;
        Self::ensure_not_importing(&session)?;
        session.brand_id = Some(brand_id.to_string());
        session.format = Some(format);
        session.back_to_idle();
        Ok(())
    }

    /// 选择上传文件（回到 idle）
    pub fn select_file(&self, file: SpreadsheetFile) -> ApiResult<()> {
        self.authorize(Resource::ExcelFormats, Action::Read)?;
        let mut session = self.session()?;
        Self::ensure_not_importing(&session)?;
        session.file = Some(file);
        session.back_to_idle();
        Ok(())
    }

    /// 清空会话（关闭导入窗口）
    pub fn reset(&self) -> ApiResult<()> {
        let mut session = self.session()?;
        Self::ensure_not_importing(&session)?;
        *session = ImportSession::default();
        Ok(())
    }

    /// 校验已选文件
    ///
    /// # 返回
    /// - ValidationResult: 校验结论；会话进入 valid 或 invalid
    #[instrument(skip(self))]
    pub async fn validate(&self) -> ApiResult<ValidationResult> {
        let (file, format) = {
            let mut session = self.session()?;
            Self::ensure_not_importing(&session)?;
            let (Some(file), Some(format)) = (session.file.clone(), session.format.clone()) else {
                return Err(ApiError::InvalidInput(i18n::t("import.select_format_and_file")));
            };
            session.back_to_idle();
            session.phase = ImportPhase::Validating;
            (file, format)
        };

        let validation = self.importer.validate_file(&file, &format).await;

        let mut session = self.session()?;
        session.phase = if validation.is_valid {
            ImportPhase::Valid
        } else {
            ImportPhase::Invalid
        };
        session.validation = Some(validation.clone());
        info!(phase = ?session.phase, errors = validation.errors.len(), "校验阶段结束");
        Ok(validation)
    }

    /// 确认导入
    ///
    /// # 参数
    /// - confirmed: 行数超过确认阈值时必须为 true
    /// - cancel: 取消令牌（批次之间生效）
    /// - on_progress: 每批完成后回调
    ///
    /// # 错误
    /// - ConfirmationRequired: 行数超过阈值且未确认
    /// - InvalidInput: 会话不在 valid 状态或没有可导入数据
    #[instrument(skip(self, cancel, on_progress))]
    pub async fn confirm_import<F>(
        &self,
        confirmed: bool,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> ApiResult<BatchResult>
    where
        F: FnMut(ImportProgress) + Send,
    {
        self.authorize(Resource::Products, Action::Create)?;

        let (brand_id, format, rows) = {
            let mut session = self.session()?;
            Self::ensure_not_importing(&session)?;
            if session.phase != ImportPhase::Valid {
                return Err(ApiError::InvalidInput(i18n::t("import.fix_errors")));
            }
            let rows = session
                .validation
                .as_ref()
                .and_then(|v| v.data.clone())
                .unwrap_or_default();
            if rows.is_empty() {
                return Err(ApiError::InvalidInput(i18n::t("import.no_data")));
            }
            if rows.len() > self.limits.confirm_threshold_rows && !confirmed {
                return Err(ApiError::ConfirmationRequired { rows: rows.len() });
            }
            let (Some(brand_id), Some(format)) = (session.brand_id.clone(), session.format.clone())
            else {
                return Err(ApiError::InvalidInput(i18n::t("import.select_format_and_file")));
            };
            session.phase = ImportPhase::Importing;
            session.result = None;
            session.progress = None;
            (brand_id, format, rows)
        };

        let guard = ImportingGuard::new(&self.session);
        info!(brand_id = %brand_id, format_id = %format.id, rows = rows.len(), "开始导入");

        let session_lock = &self.session;
        let mut report = |progress: ImportProgress| {
            if let Ok(mut session) = session_lock.lock() {
                session.progress = Some(progress);
            }
            on_progress(progress);
        };
        let result = self
            .importer
            .import_rows(&brand_id, &format, &rows, cancel, &mut report)
            .await;

        let mut session = self.session()?;
        session.phase = if result.cancelled {
            warn!(success = result.success_count, "导入已取消");
            ImportPhase::Failed
        } else {
            ImportPhase::Completed
        };
        session.result = Some(result.clone());
        drop(session);
        guard.finish();
        info!(
            success = result.success_count,
            failed_batches = result.errors.len(),
            skipped = result.skipped_duplicates.len(),
            "导入结束"
        );
        Ok(result)
    }

    /// 下载导入模板
    pub fn download_template(&self, format_id: &str) -> ApiResult<TemplateFile> {
        self.authorize(Resource::ExcelFormats, Action::Read)?;
        let format = self
            .formats
            .get_format(format_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ExcelFormat(id={})不存在", format_id)))?;
        let brand_name = self
            .brand_repo
            .get_brand(&format.brand_id)?
            .map(|b| b.name)
            .unwrap_or_default();
        Ok(self.formats.generate_template(&format, &brand_name)?)
    }
}
