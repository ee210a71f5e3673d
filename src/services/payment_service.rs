use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{CreatePaymentRequest, Invoice, InvoiceStatus, Payment, PaymentResponse};

/// Status after payments totalling `total_paid` against an invoice of `total`.
///
/// Only ever moves towards PAID; an invoice is never downgraded here.
pub fn settle_status(current: InvoiceStatus, total_paid: Decimal, total: Decimal) -> InvoiceStatus {
    let derived = if total_paid >= total {
        InvoiceStatus::Paid
    } else if total_paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else {
        current
    };

    if derived.rank() > current.rank() {
        derived
    } else {
        current
    }
}

pub struct PaymentService;

impl PaymentService {
    /// Appends a payment and reconciles the invoice status in one transaction.
    ///
    /// The invoice row is locked first, so concurrent payments on the same invoice
    /// serialize and each recomputes the sum from committed rows.
    pub async fn record_payment(
        pool: &PgPool,
        request: &CreatePaymentRequest,
    ) -> AppResult<PaymentResponse> {
        let invoice_id = request
            .invoice_id
            .ok_or_else(|| AppError::BadRequest("invoice_id is required".to_string()))?;

        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }

        let mut tx = pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invoice not found".to_string()))?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (invoice_id, amount, method, paid_at)
            VALUES ($1, $2, $3, COALESCE($4, NOW()))
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(request.amount)
        .bind(request.method)
        .bind(request.paid_at)
        .fetch_one(&mut *tx)
        .await?;

        let (total_paid,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = $1",
        )
        .bind(invoice.id)
        .fetch_one(&mut *tx)
        .await?;

        let status = settle_status(invoice.status, total_paid, invoice.total);
        if status != invoice.status {
            sqlx::query("UPDATE invoices SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(invoice.id)
                .bind(status)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            invoice_id = %invoice.id,
            amount = %payment.amount,
            total_paid = %total_paid,
            status = ?status,
            "Payment recorded"
        );

        Ok(PaymentResponse {
            payment,
            invoice_status: status,
            total_paid,
        })
    }

    pub async fn list_for_invoice(pool: &PgPool, invoice_id: uuid::Uuid) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE invoice_id = $1 ORDER BY paid_at",
        )
        .bind(invoice_id)
        .fetch_all(pool)
        .await?;

        Ok(payments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn partial_then_paid() {
        let total = dec!(1500000);

        let after_first = settle_status(InvoiceStatus::Unpaid, dec!(500000), total);
        assert_eq!(after_first, InvoiceStatus::Partial);

        let after_second = settle_status(after_first, dec!(1500000), total);
        assert_eq!(after_second, InvoiceStatus::Paid);
    }

    #[test]
    fn overpayment_is_paid() {
        assert_eq!(
            settle_status(InvoiceStatus::Unpaid, dec!(2000000), dec!(1500000)),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn nothing_paid_keeps_status() {
        assert_eq!(
            settle_status(InvoiceStatus::Unpaid, Decimal::ZERO, dec!(100)),
            InvoiceStatus::Unpaid
        );
    }

    #[test]
    fn zero_total_invoice_settles_on_first_payment() {
        assert_eq!(
            settle_status(InvoiceStatus::Unpaid, dec!(1), Decimal::ZERO),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn never_regresses() {
        // Manually marked paid, then a small payment arrives
        assert_eq!(
            settle_status(InvoiceStatus::Paid, dec!(100), dec!(1500000)),
            InvoiceStatus::Paid
        );
        // Total raised by a corrected reading after partial payment
        assert_eq!(
            settle_status(InvoiceStatus::Partial, Decimal::ZERO, dec!(1500000)),
            InvoiceStatus::Partial
        );
    }

    #[test]
    fn status_matches_payment_sum_from_unpaid() {
        let total = dec!(1000);
        let cases = [
            (dec!(0), InvoiceStatus::Unpaid),
            (dec!(0.01), InvoiceStatus::Partial),
            (dec!(999.99), InvoiceStatus::Partial),
            (dec!(1000), InvoiceStatus::Paid),
            (dec!(1000.01), InvoiceStatus::Paid),
        ];

        for (paid, expected) in cases {
            assert_eq!(settle_status(InvoiceStatus::Unpaid, paid, total), expected, "paid {}", paid);
        }
    }
}
